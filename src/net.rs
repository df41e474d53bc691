//! TCP port allocation for launched fixture apps.

use std::net::TcpListener;

use crate::error::E2eResult;

/// Find a TCP port that is currently unbound.
///
/// Binds port 0 so the OS hands out a free port, then releases it right
/// away. Another process may grab the port between the release and the
/// child's own bind; that narrow window is accepted instead of holding a
/// reservation open. Scanning the connection table was rejected as the
/// alternative because it misses TIME_WAIT and idle listening sockets.
pub fn free_port() -> E2eResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_port_is_outside_the_reserved_range() {
        let port = free_port().unwrap();
        assert!(port > 1024);
    }

    #[test]
    fn returned_port_is_immediately_bindable() {
        let port = free_port().unwrap();
        TcpListener::bind(("127.0.0.1", port)).expect("freshly allocated port should bind");
    }
}
