/// Transaction-API callbacks of one data model.
///
/// The library calls into it when the datastore it backs comes online and
/// when the library goes away.
pub(crate) trait TransApi {
    /// Name of the module whose configuration the callbacks apply.
    fn module(&self) -> &str;

    /// Called once the running configuration has been set up from startup.
    fn init(&mut self, running: &str) -> anyhow::Result<()>;

    fn close(&mut self) {}

    /// State data to report next to `config`.
    fn get_state(&self, _config: &str) -> Option<String> {
        None
    }
}
