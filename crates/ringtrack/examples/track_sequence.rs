//! Track a synthetic ring drifting across a VGA frame and report timing.
//!
//! Usage: `cargo run --example track_sequence [frames]`

use std::time::Instant;

use nalgebra::Point2;
use ringtrack::core::synth::{render_dark_ring, RingShape};
use ringtrack::{RingDetector, RingDetectorParams};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        ringtrack::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    ringtrack::core::init_with_level(log::LevelFilter::Info)?;

    let frames: usize = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(60);

    let (width, height) = (640, 480);
    let mut detector = RingDetector::new(width, height, RingDetectorParams::default())?;
    let mut found = 0usize;
    let mut elapsed = 0.0f64;

    for i in 0..frames {
        let t = i as f32 / frames.max(1) as f32;
        let center = Point2::new(160.0 + 320.0 * t, 240.0 + 80.0 * (6.0 * t).sin());
        let frame = render_dark_ring(width, height, &RingShape::circle(center, 36.0, 18.0));

        let start = Instant::now();
        let ring = detector.detect(&frame.view())?;
        elapsed += start.elapsed().as_secs_f64();

        if ring.valid {
            found += 1;
            let err = (ring.center - center).norm();
            println!(
                "frame {i:3}: ({:7.2}, {:7.2}) err {err:.3} px, tracking {}, threshold {}",
                ring.center.x,
                ring.center.y,
                detector.last_stats().tracking,
                ring.threshold
            );
        } else {
            println!("frame {i:3}: lost ({} failures)", detector.failures());
        }
    }

    println!(
        "{found}/{frames} frames tracked, {:.3} ms per frame",
        1e3 * elapsed / frames.max(1) as f64
    );
    Ok(())
}
