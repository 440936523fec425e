/// Configuration for a [`RadixTree`](crate::RadixTree).
#[derive(Debug, Clone)]
pub struct Config {
    /// Expected number of keys. Pre-sizes the exact-match index and the
    /// node registry.
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}
