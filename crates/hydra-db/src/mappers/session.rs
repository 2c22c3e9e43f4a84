//! Session model -> entity mapper

use hydra_core::Session;

use crate::models::SessionModel;

impl From<SessionModel> for Session {
    fn from(model: SessionModel) -> Self {
        Session {
            id: model.id,
            user_id: model.user_id,
            session_token: model.session_token,
            refresh_token: model.refresh_token,
            device_info: model.device_info.0,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
            expires_at: model.expires_at,
            is_active: model.is_active,
        }
    }
}
