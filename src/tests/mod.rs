//! Cross-module scenario tests: one file per concrete end-to-end case,
//! exercising the server front end and resolver together the way a real
//! client would, over real loopback sockets rather than mocked layers.

mod common;
mod s2_malformed_packet;
mod s3_rate_limit;
mod s4_upstream_failover;
mod s5_negative_caching;
mod s6_tcp_pipelining;
