//! Domain entities - core business objects

mod session;
mod user;

pub use session::{
    generate_session_token, DeviceInfo, RequestContext, Session, SessionStatus, SESSION_TOKEN_LEN,
};
pub use user::User;
