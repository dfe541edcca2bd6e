//! Built-in resource handlers.

mod clients;
mod connections;
mod resource_servers;
mod roles;
mod rules;

pub use clients::{ClientsHandler, CLIENTS};
pub use connections::{ConnectionsHandler, CONNECTIONS};
pub use resource_servers::{ResourceServersHandler, RESOURCE_SERVERS};
pub use roles::{RolesHandler, ROLES};
pub use rules::{RulesHandler, RULES};

use crate::handler::ResourceHandler;

/// Every built-in handler, in registration order.
pub fn default_handlers() -> Vec<Box<dyn ResourceHandler>> {
    vec![
        Box::new(ResourceServersHandler::new()),
        Box::new(ClientsHandler::new()),
        Box::new(ConnectionsHandler::new()),
        Box::new(RolesHandler::new()),
        Box::new(RulesHandler::new()),
    ]
}
