//! # Head-Impact Kinematics Preprocessing
//!
//! This crate turns raw head-impact recordings (angular and linear
//! acceleration time series) into injury metrics and fixed-length tensors for
//! convolutional brain-injury models.
//!
//! ## Overview
//!
//! - **Injury metrics**: DAMAGE (peak displacement of a driven 3-DOF
//!   mass-spring-damper) and UBrIC (normalized velocity/acceleration peaks)
//! - **Geometry**: rotation-axis angles, resultant magnitudes, conjugate-axis
//!   mirroring about the mid-sagittal plane
//! - **Augmentation**: six axis permutations, each peak-aligned and
//!   repeat-padded to the network's input length
//! - **Plumbing**: CSV loading, optional Butterworth cleaning, JSON tensor
//!   store, metadata label lookup, YAML configuration, logging
//!
//! ## Signal Flow
//!
//! ```text
//! Augment: CSV → profile → [detrend + low-pass] → permute ×6 → conjugate → shift+pad → tensors
//! Score:   CSV → angular acceleration ─┬→ DAMAGE (ODE: RK45 | implicit trapezoid)
//!                                      └→ UBrIC  (cumulative trapezoid → peaks)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use headkin_core::prelude::*;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let table = ImpactTable::from_path("data/raw/204_A3b_g12.csv".as_ref()).unwrap();
//! let time = table.time().unwrap();
//! let accel = table.profile_by_names(&["ang_x", "ang_y", "ang_z"]).unwrap();
//!
//! let damage = DamageIntegrator::default().damage(&accel, &time).unwrap();
//! let ubric = UbricScorer::default().score(&accel, &time).unwrap();
//!
//! let augmenter = Augmenter::new(AugmentConfig::default()).unwrap();
//! let tensors = augmenter
//!     .augment(&table.profile_by_indices(&[4, 5, 6]).unwrap(), &mut StdRng::seed_from_u64(0))
//!     .unwrap();
//! assert_eq!(tensors.len(), 6);
//! # let _ = (damage, ubric);
//! ```

pub mod config;
pub mod conjugate;
pub mod damage;
pub mod filter;
pub mod io;
pub mod logging;
pub mod metadata;
pub mod ode;
pub mod pipeline;
pub mod resultant;
pub mod shift_pad;
pub mod types;
pub mod ubric;
pub mod vector_angle;

// Re-export main types
pub use config::{ConfigError, HeadkinConfig};
pub use conjugate::{conjugate_rotational_axis, conjugate_transform};
pub use damage::{compute_damage, DamageIntegrator, DamageParams, DamageReport};
pub use filter::{filter_and_detrend, ButterworthLowpass};
pub use io::{ImpactTable, JsonTensorStore, TensorSink};
pub use metadata::{MetadataEntry, MetadataLinker};
pub use ode::{OdeSolver, OdeSystem, SolverMethod, SolverOptions};
pub use pipeline::{AugmentConfig, AugmentedTensor, Augmenter, AXIS_PERMUTATIONS};
pub use resultant::resultant;
pub use shift_pad::{shift_and_pad, PadMode, ShiftAndPad};
pub use types::{ErrorKind, KinematicProfile, PreprocessError, PreprocessResult, TimeVector};
pub use ubric::{UbricFeatureSet, UbricParams, UbricScorer};
pub use vector_angle::{angles_to_vector, vector_to_angles};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::damage::DamageIntegrator;
    pub use crate::io::{ImpactTable, JsonTensorStore, TensorSink};
    pub use crate::pipeline::{AugmentConfig, Augmenter};
    pub use crate::shift_pad::{PadMode, ShiftAndPad};
    pub use crate::types::{KinematicProfile, PreprocessError, PreprocessResult, TimeVector};
    pub use crate::ubric::UbricScorer;
}
