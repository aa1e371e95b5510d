use crate::{
    animation::ease::Ease,
    foundation::clock::Clock,
    foundation::core::{Fps, Vec2},
    foundation::math::lerp,
};

/// Per-frame wake-up source that drives tweens.
///
/// The host's render loop is the natural implementation; [`IntervalTicker`] stands in when the host
/// does not expose frame callbacks.
#[async_trait::async_trait]
pub trait FrameTicker: Send {
    /// Suspend until the next frame should be produced.
    async fn next_frame(&mut self);
}

/// Fixed-rate [`FrameTicker`] backed by a tokio interval.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: tokio::time::Interval,
}

impl IntervalTicker {
    pub fn new(fps: Fps) -> Self {
        let mut interval = tokio::time::interval(fps.frame_duration());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait::async_trait]
impl FrameTicker for IntervalTicker {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}

/// Values that can be interpolated by a tween.
pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        lerp(a, b, t)
    }
}

impl Lerp for Vec2 {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        Vec2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
    }
}

/// Property value carried by a heterogeneous tween group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenValue {
    Scalar(f64),
    Vector2(Vec2),
}

impl Lerp for TweenValue {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        match (a, b) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(f64::lerp(a, b, t)),
            (Self::Vector2(a), Self::Vector2(b)) => Self::Vector2(Vec2::lerp(a, b, t)),
            // Mismatched kinds have no meaningful midpoint.
            (_, b) => b,
        }
    }
}

impl TweenValue {
    pub fn as_scalar(self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Vector2(_) => None,
        }
    }

    pub fn as_vector2(self) -> Option<Vec2> {
        match self {
            Self::Vector2(v) => Some(v),
            Self::Scalar(_) => None,
        }
    }
}

/// One timed interpolation from `from` to `to`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TweenSpec<T> {
    pub from: T,
    pub to: T,
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub ease: Ease,
    /// Run `from -> to -> from` over `duration_ms` (a pulse).
    pub yoyo: bool,
}

impl<T: Lerp> TweenSpec<T> {
    pub fn new(from: T, to: T, duration_ms: u64, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration_ms,
            delay_ms: 0,
            ease,
            yoyo: false,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn pulse(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn end_ms(&self) -> u64 {
        self.delay_ms.saturating_add(self.duration_ms)
    }

    /// Sample at `elapsed_ms` since the group started. Returns the value and whether the tween has
    /// finished. Before the delay has elapsed the value is `from`.
    pub fn sample(&self, elapsed_ms: u64) -> (T, bool) {
        if elapsed_ms < self.delay_ms {
            return (self.from, false);
        }
        let local = elapsed_ms - self.delay_ms;
        let done = local >= self.duration_ms;
        let t = if self.duration_ms == 0 || done {
            1.0
        } else {
            local as f64 / self.duration_ms as f64
        };

        let value = if self.yoyo {
            let phase = if t < 0.5 { t * 2.0 } else { (1.0 - t) * 2.0 };
            T::lerp(self.from, self.to, self.ease.apply(phase))
        } else {
            T::lerp(self.from, self.to, self.ease.apply(t))
        };
        (value, done)
    }
}

impl TweenSpec<f64> {
    pub fn into_track(self) -> TweenTrack {
        map_spec(self, TweenValue::Scalar)
    }
}

impl TweenSpec<Vec2> {
    pub fn into_track(self) -> TweenTrack {
        map_spec(self, TweenValue::Vector2)
    }
}

fn map_spec<T: Copy>(s: TweenSpec<T>, f: impl Fn(T) -> TweenValue) -> TweenTrack {
    TweenSpec {
        from: f(s.from),
        to: f(s.to),
        duration_ms: s.duration_ms,
        delay_ms: s.delay_ms,
        ease: s.ease,
        yoyo: s.yoyo,
    }
}

/// Member of a [`tween_group`].
pub type TweenTrack = TweenSpec<TweenValue>;

/// Value of one group track on one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSample {
    pub index: usize,
    pub value: TweenValue,
    /// First frame this track produced a value (its delay just elapsed).
    pub just_started: bool,
}

/// Summary of a completed tween run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TweenReport {
    pub frames: u32,
}

/// Run several tracks with independent delays, durations and easings under one completion gate.
///
/// `apply` is called once per frame with the samples of every track that is active on that frame.
/// Every track is guaranteed to deliver its final value, even when a frame arrives late. The
/// function suspends only on `ticker`.
pub async fn tween_group<F>(
    ticker: &mut dyn FrameTicker,
    clock: &dyn Clock,
    tracks: &[TweenTrack],
    mut apply: F,
) -> TweenReport
where
    F: FnMut(&[TrackSample]),
{
    let mut report = TweenReport::default();
    if tracks.is_empty() {
        return report;
    }

    let start = clock.now();
    let mut started = vec![false; tracks.len()];
    let mut finished = vec![false; tracks.len()];
    let mut samples = Vec::with_capacity(tracks.len());

    loop {
        ticker.next_frame().await;
        report.frames = report.frames.saturating_add(1);
        let elapsed = start.ms_until(clock.now());

        samples.clear();
        for (index, track) in tracks.iter().enumerate() {
            if finished[index] || elapsed < track.delay_ms {
                continue;
            }
            let (value, done) = track.sample(elapsed);
            samples.push(TrackSample {
                index,
                value,
                just_started: !started[index],
            });
            started[index] = true;
            finished[index] = done;
        }

        if !samples.is_empty() {
            apply(&samples);
        }
        if finished.iter().all(|f| *f) {
            return report;
        }
    }
}

/// Tween a single scalar property.
pub async fn tween_scalar<F>(
    ticker: &mut dyn FrameTicker,
    clock: &dyn Clock,
    spec: TweenSpec<f64>,
    mut apply: F,
) -> TweenReport
where
    F: FnMut(f64),
{
    let tracks = [spec.into_track()];
    tween_group(ticker, clock, &tracks, |samples| {
        for s in samples {
            if let Some(v) = s.value.as_scalar() {
                apply(v);
            }
        }
    })
    .await
}

/// Tween a single 2D vector property.
pub async fn tween_vector2<F>(
    ticker: &mut dyn FrameTicker,
    clock: &dyn Clock,
    spec: TweenSpec<Vec2>,
    mut apply: F,
) -> TweenReport
where
    F: FnMut(Vec2),
{
    let tracks = [spec.into_track()];
    tween_group(ticker, clock, &tracks, |samples| {
        for s in samples {
            if let Some(v) = s.value.as_vector2() {
                apply(v);
            }
        }
    })
    .await
}

#[cfg(test)]
#[path = "../../tests/unit/animation/tween.rs"]
mod tests;
