mod body;
mod resource_graph;

pub use body::{full_name, searchable_body};
pub use resource_graph::{GraphObserver, ResourceGraph};
