//! Master-server state: peer handshake, call tracking, and the dispatcher
//! that ties them to a datagram transport. See SPEC_FULL.md §4.

pub mod auth;
pub mod call;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod peer;
pub mod registry;
pub mod transport;

pub use auth::{AllowAll, AuthPolicy, DenyAll, ListAuth};
pub use call::{Call, CallTracker, RouteTo};
pub use dispatcher::{AppInterceptor, Dispatcher, DispatcherMetrics, NoopMetrics};
pub use error::{DmrError, DmrResult};
pub use peer::{Peer, PeerStatus};
pub use registry::PeerRegistry;
pub use transport::{DatagramTransport, UdpTransport};
