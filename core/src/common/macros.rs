/// Fast impl `Display` trait for `Debug` types.
/// Check <https://www.rustwiki.org.cn/en/reference/introduction.html> for help information.
#[allow(unused_macros)]
#[macro_export]
macro_rules! impl_display_by_debug {
    ($struct_name:ident$(<$($generic1:tt $( : $trait_tt1: tt $( + $trait_tt2: tt)*)?),+>)?
        $(where $(
            $generic2:tt $( : $trait_tt3: tt $( + $trait_tt4: tt)*)?
        ),+)?
    ) => {
        impl$(<$($generic1 $( : $trait_tt1 $( + $trait_tt2)*)?),+>)? std::fmt::Display
            for $struct_name$(<$($generic1),+>)?
        where
            $($($generic2 $( : $trait_tt3 $( + $trait_tt4)*)?),+,)?
            $struct_name$(<$($generic1),+>)?: std::fmt::Debug,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

/// Fast impl `Current` for a cheaply cloneable handle type.
/// Each thread keeps a stack, so nested `init_current` calls restore the outer
/// value on `clean_current`.
#[allow(unused_macros)]
#[macro_export]
macro_rules! impl_current_for {
    ( $name:ident, $struct_name:ident ) => {
        thread_local! {
            static $name: std::cell::RefCell<std::collections::VecDeque<$struct_name>> =
                const { std::cell::RefCell::new(std::collections::VecDeque::new()) };
        }

        impl $crate::common::traits::Current for $struct_name {
            fn init_current(current: &Self) {
                $name.with(|s| s.borrow_mut().push_front(current.clone()));
            }

            fn current() -> Option<Self> {
                $name.with(|s| s.borrow().front().cloned())
            }

            fn clean_current() {
                $name.with(|s| _ = s.borrow_mut().pop_front());
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        tracing::info!($($arg)+);
        #[cfg(not(feature = "log"))]
        if false {
            _ = format!($($arg)+);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        tracing::debug!($($arg)+);
        #[cfg(not(feature = "log"))]
        if false {
            _ = format!($($arg)+);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        tracing::warn!($($arg)+);
        #[cfg(not(feature = "log"))]
        if false {
            _ = format!($($arg)+);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        tracing::error!($($arg)+);
        #[cfg(not(feature = "log"))]
        if false {
            _ = format!($($arg)+);
        }
    };
}
