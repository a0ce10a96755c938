//! Asynchronous delay abstraction pacing the timer service.

/// Delay provider; must remain thread-safe when applicable.
pub trait TickSource {
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(
        &'a mut self,
        millis: u32,
    ) -> impl core::future::Future<Output = ()> + 'a;
}

/// [`TickSource`] backed by the `embassy-time` driver of the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyTickSource;

impl TickSource for EmbassyTickSource {
    fn delay_ms<'a>(
        &'a mut self,
        millis: u32,
    ) -> impl core::future::Future<Output = ()> + 'a {
        embassy_time::Timer::after_millis(u64::from(millis))
    }
}
