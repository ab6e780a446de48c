/// Browser clock and timers
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{FutureExt, LocalBoxFuture};
use gloo_timers::callback::Interval;
use wasm_bindgen_futures::spawn_local;

use crate::page::{Handler, Scheduler};

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    type Ticker = Interval;

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(delay).boxed_local()
    }

    fn every(&self, period: Duration, mut tick: Handler) -> Interval {
        Interval::new(millis(period), move || tick())
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        spawn_local(task);
    }
}

pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
