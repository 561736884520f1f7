//! Remote side of the address model: server path grammars, the protocol registry and server
//! descriptors.
//!
//! # Example
//!
//! ```
//! use remote::{Server, ServerType};
//!
//! let mut server = Server::new();
//! let path = server.parse_url("sftp://bob@example.com/home/bob", 0, "", "").unwrap();
//! assert_eq!(server.get_port(), 22);
//! assert_eq!(path.get_type(), ServerType::Unix);
//! assert_eq!(path.get_parent().get_path(), "/home");
//! ```

pub mod protocol;
pub mod server;
pub mod server_path;
pub mod server_type;

pub use protocol::{ProtocolInfo, ServerProtocol};
pub use server::{CharsetEncoding, LogonType, PasvMode, Server, ServerRecord};
pub use server_path::ServerPath;
pub use server_type::{PrefixMode, ServerType, Traits};
