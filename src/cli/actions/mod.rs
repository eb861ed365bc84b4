pub mod server;

use crate::config::Config;

#[derive(Debug)]
pub enum Action {
    Server { config: Config },
}
