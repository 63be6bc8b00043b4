// File: testing-framework/src/registry/checks.rs
//
// Assertion helpers for test bodies. A failed check returns
// `TestError::CheckFailed` from the enclosing function instead of panicking,
// so the runner records the test as failed and moves on.

/// Fail the enclosing test body unless `cond` holds
#[macro_export]
macro_rules! test_check {
    ($cond:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err(::core::convert::From::from(
                $crate::error::TestError::CheckFailed(format!(
                    "{} at {}:{}",
                    stringify!($cond),
                    file!(),
                    line!()
                )),
            ));
        }
    };
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            return ::core::result::Result::Err(::core::convert::From::from(
                $crate::error::TestError::CheckFailed(format!(
                    "{} at {}:{}",
                    format!($($msg)+),
                    file!(),
                    line!()
                )),
            ));
        }
    };
}

/// Fail the enclosing test body unless `left == right`
#[macro_export]
macro_rules! test_check_equal {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if !(*left == *right) {
                    return ::core::result::Result::Err(::core::convert::From::from(
                        $crate::error::TestError::CheckFailed(format!(
                            "{} == {} ({:?} != {:?}) at {}:{}",
                            stringify!($left),
                            stringify!($right),
                            left,
                            right,
                            file!(),
                            line!()
                        )),
                    ));
                }
            }
        }
    };
    ($left:expr, $right:expr, $($msg:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if !(*left == *right) {
                    return ::core::result::Result::Err(::core::convert::From::from(
                        $crate::error::TestError::CheckFailed(format!(
                            "{} ({:?} != {:?}) at {}:{}",
                            format!($($msg)+),
                            left,
                            right,
                            file!(),
                            line!()
                        )),
                    ));
                }
            }
        }
    };
}

/// Fail the enclosing test body if `left == right`
#[macro_export]
macro_rules! test_check_not_equal {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left == *right {
                    return ::core::result::Result::Err(::core::convert::From::from(
                        $crate::error::TestError::CheckFailed(format!(
                            "{} != {} (both {:?}) at {}:{}",
                            stringify!($left),
                            stringify!($right),
                            left,
                            file!(),
                            line!()
                        )),
                    ));
                }
            }
        }
    };
}
