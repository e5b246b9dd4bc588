// Domain layer: core models and ports (interfaces). No knowledge of HTTP,
// storage backends or the CLI.

pub mod model;
pub mod ports;
