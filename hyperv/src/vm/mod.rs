mod generation;

pub use generation::{resolve_vm_generation, Generation};
