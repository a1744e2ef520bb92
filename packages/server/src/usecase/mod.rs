//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod accept_connection;
pub mod disconnect_connection;
pub mod error;
pub mod route_event;

pub use accept_connection::AcceptConnectionUseCase;
pub use disconnect_connection::DisconnectConnectionUseCase;
pub use error::{AuthError, RouteError};
pub use route_event::{RouteEventUseCase, RouteOutcome};
