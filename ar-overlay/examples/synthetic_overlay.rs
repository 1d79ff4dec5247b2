use ar_overlay::synthetic::{block_pattern, paste_on_canvas, solid};
use ar_overlay::{FrameOutcome, SessionBuilder, WarpInterpolation};
use image::imageops::{self, FilterType};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎯 Synthetic AR Overlay Demo");
    println!("============================\n");

    let query = block_pattern(100, 10, 42);
    let ar = solid(100, 100, [30, 144, 255]);

    let session = SessionBuilder::new()
        .min_match_count(10)
        .interpolation(WarpInterpolation::Bilinear)
        .build(&query, ar)?;
    println!("📷 Query: 100x100, {} features", session.query_model().features.len());

    // Scene 1: pasted as-is
    println!("\n🧩 Scene 1: Query pasted at (50, 50)");
    let frame = paste_on_canvas(&query, 300, 300, 50, 50);
    run_scene(&session, &frame, "synthetic_pasted")?;

    // Scene 2: pasted at 1.5x
    println!("\n🔍 Scene 2: Query scaled 1.5x at (40, 60)");
    let scaled = imageops::resize(&query, 150, 150, FilterType::Triangle);
    let frame = paste_on_canvas(&scaled, 320, 320, 40, 60);
    run_scene(&session, &frame, "synthetic_scaled")?;

    // Scene 3: nothing to find
    println!("\n⬜ Scene 3: Blank canvas");
    let frame = solid(300, 300, [255, 255, 255]);
    run_scene(&session, &frame, "synthetic_blank")?;

    println!("\n🎉 Done. Check synthetic_*_ar.png");
    Ok(())
}

fn run_scene(
    session: &ar_overlay::ArSession,
    frame: &image::RgbImage,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let t0 = Instant::now();
    let result = session.process(frame);
    let elapsed = t0.elapsed();

    match &result.outcome {
        FrameOutcome::Overlaid { good_matches, inliers, quad } => {
            println!("   ✅ Overlaid in {:.2?}: {} good matches, {} inliers", elapsed, good_matches, inliers);
            for c in &quad.corners {
                println!("      corner ({:.1}, {:.1})", c.x, c.y);
            }
        }
        FrameOutcome::NotFound(reason) => println!("   ❌ Not found in {:.2?}: {}", elapsed, reason),
    }

    result.frame.save(format!("{}_ar.png", name))?;
    Ok(())
}
