//! Planar AR overlay: find a reference image in a frame and draw another image
//! over it in perspective.
//!
//! ```no_run
//! use ar_overlay::{SessionBuilder, SessionConfig};
//!
//! let query = image::open("poster.png")?.to_rgb8();
//! let ar = image::open("trailer_still.png")?.to_rgb8();
//! let session = SessionBuilder::from_config(SessionConfig::still_image()).build(&query, ar)?;
//!
//! let frame = image::open("street.jpg")?.to_rgb8();
//! session.locate_and_overlay(&frame).save("street_ar.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod compositor;
pub mod config;
pub mod error;
pub mod extractor;
pub mod session;
pub mod synthetic;

pub use builder::SessionBuilder;
pub use compositor::{CompositeConfig, ImageprocWarper, WarpInterpolation};
pub use config::SessionConfig;
pub use error::{ConfigError, OverlayError, OverlayResult};
pub use extractor::GradientFeatures;
pub use session::{
    ArSession, Capabilities, FrameOutcome, FrameResult, Located, NotFoundReason, QueryModel,
};

pub use ar_core::{self, init_thread_pool, CoreConfig, Quad};
