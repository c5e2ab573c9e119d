use std::{io, net::SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use zrelay_error::{SetupError, TransportError};

/// Открывает прослушивающий сокет для стороны `role`.
///
/// Любая ошибка здесь фатальна: прокси без обоих адресов существовать не
/// может.
pub async fn bind_listener(
    role: &'static str,
    address: &str,
) -> Result<(TcpListener, SocketAddr), SetupError> {
    let bind_err = |source: io::Error| SetupError::Bind {
        role,
        address: address.to_string(),
        source,
    };

    let listener = TcpListener::bind(address).await.map_err(bind_err)?;
    let local_addr = listener.local_addr().map_err(bind_err)?;
    debug!(role, %local_addr, "listener bound");

    Ok((listener, local_addr))
}

/// Подключается к адресу прокси. Общий для издателя и подписчика.
///
/// Фреймы маленькие и отправляются по одному, поэтому Nagle отключён.
pub async fn dial(address: &str) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Принимает следующее соединение.
///
/// Ошибки, относящиеся к одному соединению (клиент ушёл до `accept`),
/// логируются и пропускаются. Прочие ошибки означают отказ слушателя.
pub async fn accept_next(
    role: &'static str,
    listener: &TcpListener,
) -> Result<(TcpStream, SocketAddr), TransportError> {
    loop {
        match listener.accept().await {
            Ok(pair) => return Ok(pair),
            Err(e) if is_connection_error(&e) => {
                warn!(role, error = %e, "connection dropped before accept");
            }
            Err(source) => return Err(TransportError::Accept { role, source }),
        }
    }
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что `dial` подключается с отключённым Nagle.
    #[tokio::test]
    async fn test_dial_sets_nodelay() {
        let (listener, local_addr) = bind_listener("test", "127.0.0.1:0").await.unwrap();
        let stream = dial(&local_addr.to_string()).await.unwrap();
        assert!(stream.nodelay().unwrap());
        let (_accepted, peer) = accept_next("test", &listener).await.unwrap();
        assert_eq!(peer, stream.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let (listener, local_addr) = bind_listener("test", "127.0.0.1:0").await.unwrap();
        drop(listener);
        let err = dial(&local_addr.to_string()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    /// Тест проверяет, что порт 0 заменяется реально выделенным портом.
    #[tokio::test]
    async fn test_bind_reports_actual_port() {
        let (_listener, addr) = bind_listener("ingress", "127.0.0.1:0").await.unwrap();
        assert_ne!(addr.port(), 0);
    }

    /// Тест проверяет, что занятый адрес даёт ошибку `AddrInUse`.
    #[tokio::test]
    async fn test_bind_address_in_use() {
        let (_held, addr) = bind_listener("egress", "127.0.0.1:0").await.unwrap();
        let err = bind_listener("egress", &addr.to_string()).await.unwrap_err();
        assert!(err.is_address_in_use(), "{err}");
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let err = bind_listener("ingress", "not an address").await.unwrap_err();
        assert!(matches!(err, SetupError::Bind { role: "ingress", .. }));
    }

    #[test]
    fn test_connection_errors() {
        assert!(is_connection_error(&io::Error::from(
            io::ErrorKind::ConnectionAborted
        )));
        assert!(!is_connection_error(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }
}
