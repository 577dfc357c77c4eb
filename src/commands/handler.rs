//! Command Dispatch
//!
//! Executes decoded commands against the store and produces replies.
//!
//! | Command                  | Reply                       |
//! |--------------------------|-----------------------------|
//! | `PING`                   | `+PONG`                     |
//! | `ECHO msg`               | `+msg`                      |
//! | `SET key value [PX ms]`  | `+OK`                       |
//! | `GET key`                | `+value` or `$-1`           |
//! | anything else            | `+OK`                       |

use crate::protocol::{Command, Reply};
use crate::storage::ExpiringStore;
use std::sync::Arc;
use tracing::trace;

/// Dispatches commands to the store.
///
/// Cheap to clone; every connection gets its own copy sharing one store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<ExpiringStore>,
}

impl CommandHandler {
    pub fn new(storage: Arc<ExpiringStore>) -> Self {
        Self { storage }
    }

    /// Executes a command and returns the reply to send.
    pub fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Ping => Reply::pong(),
            Command::Echo(message) => Reply::simple_string(message),
            Command::Set { key, value, ttl } => {
                self.storage.set(key, value, ttl);
                Reply::ok()
            }
            Command::Get(key) => match self.storage.get(&key) {
                Some(value) => Reply::simple_string(value),
                None => Reply::null(),
            },
            Command::Unknown(name) => {
                trace!(command = %name, "Unknown command, replying OK");
                Reply::ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;
    use bytes::Bytes;
    use std::time::Duration;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(ExpiringStore::new()))
    }

    /// Frames `args` as a request and decodes it.
    fn make_command(args: &[&str]) -> Command {
        let mut buf = format!("*{}\r\n", args.len());
        for arg in args {
            buf.push_str(&format!("${}\r\n{}\r\n", arg.len(), arg));
        }
        decode(buf.as_bytes()).unwrap()
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();
        assert_eq!(handler.execute(make_command(&["PING"])), Reply::pong());
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["ECHO", "hello"]));
        assert_eq!(response, Reply::simple_string("hello"));
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "foo", "bar"]));
        assert_eq!(response, Reply::ok());

        let response = handler.execute(make_command(&["GET", "foo"]));
        assert_eq!(response, Reply::simple_string(Bytes::from("bar")));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["GET", "missing"]));
        assert_eq!(response, Reply::null());
    }

    #[test]
    fn test_set_with_px_expires() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["SET", "foo", "bar", "PX", "50"]));
        assert_eq!(response, Reply::ok());
        assert_eq!(
            handler.execute(make_command(&["GET", "foo"])),
            Reply::simple_string("bar")
        );

        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(handler.execute(make_command(&["GET", "foo"])), Reply::null());
    }

    #[test]
    fn test_unknown_command_is_ok() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["CONFIG", "GET", "save"]));
        assert_eq!(response, Reply::ok());
    }

    #[test]
    fn test_handlers_share_store() {
        let storage = Arc::new(ExpiringStore::new());
        let a = CommandHandler::new(Arc::clone(&storage));
        let b = a.clone();

        a.execute(make_command(&["SET", "shared", "yes"]));
        assert_eq!(
            b.execute(make_command(&["GET", "shared"])),
            Reply::simple_string("yes")
        );
        assert_eq!(storage.len(), 1);
    }
}
