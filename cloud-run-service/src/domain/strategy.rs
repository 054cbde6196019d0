use telemetry_core::{logger, traced};

/// Placeholder business logic run by the root handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct Strategy;

impl Strategy {
    /// Runs the strategy in its own span, named after `Strategy::execute`.
    pub fn run(&self) -> String {
        traced(Self::execute)(self)
    }

    fn execute(&self) -> String {
        logger().info("Start Strategy.run");
        "Strategy called".to_string()
    }
}
