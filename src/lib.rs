//! This library provides the Lie group algebra of rigid body motion: rotations ([`So3`]), rigid
//! motions ([`Se3`]), and the compounded motion-tangent maps ([`Cmtm`]) that carry velocities and
//! their time derivatives between frames consistently with those motions.
//!
//! Every value is immutable and always valid. Constructors that build a value from scratch (eg,
//! [`So3::from_axis_angle`] or [`Se3::exp`]) produce a valid element by construction, and
//! constructors that accept an already-built representation (eg, [`So3::set_mat`],
//! [`So3::set_quaternion`], or [`Se3::from_matrix`]) validate it to within
//! [`util::DEFAULT_TOLERANCE`] and fail with an [`Error`] instead of handing back something that is
//! not actually a rotation.
//!
//! The building blocks live in their own modules: [`skew`] maps between 3-vectors and their
//! skew-symmetric generators, and [`quaternion`] converts between unit quaternions and rotation
//! matrices. The [`LieGroup`] trait captures what all three groups have in common.
//!
//! # Examples
//!
//! Rotations and motions compose with `*`, using the usual matrix convention that the right-hand
//! operand is applied first:
//!
//! ```
//! use motion_algebra::{Se3, So3, Vector3};
//! use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};
//!
//! let yaw = So3::from_axis_angle(&Vector3::z(), FRAC_PI_2)?;
//! let pitch = So3::from_axis_angle(&Vector3::y(), -FRAC_PI_6)?;
//!
//! let x = Vector3::new(0.5, -0.25, 1.0);
//! let composed = (yaw * pitch).apply(&x);
//! let sequential = yaw.apply(&pitch.apply(&x));
//! assert!((composed - sequential).norm() < 1e-12);
//!
//! // a rigid motion is a rotation followed by a translation
//! let pose = Se3::from_parts(yaw, Vector3::new(0.5, -0.25, 1.25))?;
//! assert!((pose * Vector3::x() - Vector3::new(0.5, 0.75, 1.25)).norm() < 1e-12);
//! # Ok::<(), motion_algebra::Error>(())
//! ```
//!
//! Invalid input is reported rather than silently accepted:
//!
//! ```
//! use motion_algebra::{Error, Matrix3, So3};
//!
//! let stretched = Matrix3::identity() * 2.;
//! assert!(matches!(So3::set_mat(&stretched), Err(Error::NotRotation { .. })));
//! ```
//!
//! The CMTM of a rigid motion is its adjoint, so composing CMTMs agrees with composing the
//! motions they came from:
//!
//! ```
//! use motion_algebra::{Cmtm, Se3, Vector3};
//!
//! let a = Se3::from_axis_angle_translation(&Vector3::z(), 0.3, &Vector3::new(1., 0., 0.))?;
//! let b = Se3::from_axis_angle_translation(&Vector3::x(), -1.2, &Vector3::new(0., 2., 0.))?;
//!
//! let composed = Cmtm::from_se3(&a) * Cmtm::from_se3(&b);
//! let direct = Cmtm::from_se3(&(a * b));
//! assert!((composed.matrix() - direct.matrix()).amax() < 1e-12);
//! # Ok::<(), motion_algebra::Error>(())
//! ```
//!
//! # Features
//!
//! - `serde` (default): `Serialize` and `Deserialize` for [`So3`] and [`Se3`]. Deserialization
//!   validates just like the corresponding constructors.
//! - `approx` (default): `AbsDiffEq` and `RelativeEq` for [`So3`], [`Se3`], and [`GenericCmtm`].

pub mod cmtm;
pub mod error;
pub mod lie;
pub mod quaternion;
pub mod se3;
pub mod skew;
pub mod so3;
pub mod util;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector6 = nalgebra::Vector6<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type Matrix4 = nalgebra::Matrix4<f64>;
pub type Matrix6 = nalgebra::Matrix6<f64>;
pub type Quaternion = nalgebra::Quaternion<f64>;

pub use cmtm::{Cmtm, GenericCmtm, RotationalCmtm, TangentAlgebra};
pub use error::{Error, Result};
pub use lie::LieGroup;
pub use se3::Se3;
pub use so3::So3;
