pub mod server;

use crate::auth::AuthConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        origin: String,
        config: AuthConfig,
    },
}
