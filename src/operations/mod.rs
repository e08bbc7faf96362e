pub mod add;
pub mod find;
pub mod remove;
pub mod util;

pub use add::add_route;
pub use add::add_route_with;
pub use add::update_route;
pub use add::update_route_with;
pub use find::find_route;
pub use remove::remove_route;
