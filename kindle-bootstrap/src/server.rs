/// The component that owns all steady-state behavior of the process.
///
/// [`crate::bootstrap::Bootstrap::run`] calls [`ServerModule::boot_server`] exactly once.
/// Implementations are expected to block for as long as the server is up (e.g. while a
/// listener is bound) and to return once it has shut down.
///
/// # Example
/// ```
/// use kindle_bootstrap::server::ServerModule;
///
/// let server = || -> anyhow::Result<()> { Ok(()) };
/// server.boot_server().unwrap();
/// ```
pub trait ServerModule {
    fn boot_server(&self) -> anyhow::Result<()>;
}

impl<F> ServerModule for F
where
    F: Fn() -> anyhow::Result<()>,
{
    fn boot_server(&self) -> anyhow::Result<()> {
        self()
    }
}
