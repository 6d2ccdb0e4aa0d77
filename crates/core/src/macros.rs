// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared by the runner crates.

/// `Display` for an enum, writing each variant's wire name.
///
/// Variants with fields are matched with `(..)`.
///
/// ```ignore
/// crate::simple_display! {
///     RunnerState {
///         WaitingForSubmit => "waiting_submit",
///         Running => "running",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Test builder wrapping a fully-populated value of the target type.
///
/// Gated behind `#[cfg(any(test, feature = "test-support"))]`. Setters come
/// from the field groups: `into` takes `impl Into<T>`, `set` takes `T`, and
/// `option` fields start as `None` and are wrapped in `Some`.
///
/// ```ignore
/// crate::builder! {
///     JobSpecBuilder for JobSpec {
///         into { job_id: JobId = "job-1" }
///         set { max_duration: u64 = 0 }
///         option { user: UserSpec }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        $builder:ident for $target:ident {
            $(into { $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)? })?
            $(set { $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)? })?
            $(option { $( $opt_field:ident : $opt_ty:ty ),* $(,)? })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        #[derive(Debug, Clone)]
        pub struct $builder($target);

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                    self.0.$into_field = v.into();
                    self
                }
            )*)?

            $($(
                pub fn $set_field(mut self, v: $set_ty) -> Self {
                    self.0.$set_field = v;
                    self
                }
            )*)?

            $($(
                pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                    self.0.$opt_field = Some(v.into());
                    self
                }
            )*)?

            pub fn build(self) -> $target {
                self.0
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            /// Builder starting from test defaults.
            pub fn builder() -> $builder {
                $builder($target {
                    $($( $into_field: $into_default.into(), )*)?
                    $($( $set_field: $set_default, )*)?
                    $($( $opt_field: None, )*)?
                })
            }
        }
    };
}

/// Chained `self -> Self` setters for a config struct's fields.
///
/// ```ignore
/// impl ExecutorConfig {
///     rn_core::setters! {
///         into { working_root: PathBuf }
///         set { kill_grace: Duration }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into { $( $into_field:ident : $into_ty:ty ),* $(,)? })?
        $(set { $( $set_field:ident : $set_ty:ty ),* $(,)? })?
    ) => {
        $($(
            pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                self.$into_field = v.into();
                self
            }
        )*)?

        $($(
            pub fn $set_field(mut self, v: $set_ty) -> Self {
                self.$set_field = v;
                self
            }
        )*)?
    };
}
