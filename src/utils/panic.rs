/// Install colored panic reports with backtraces, only when debugging.
pub fn setup() {
    #[cfg(debug_assertions)]
    {
        color_backtrace::install();
    }
}
