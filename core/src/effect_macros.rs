//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use spacemap_core::async_effect;
///
/// async_effect! {
///     match source.fetch(&filter).await {
///         Ok(listings) => Some(BrowserAction::ListingsLoaded { request, listings }),
///         Err(error) => Some(BrowserAction::ListingsFailed { request, reason: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use spacemap_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_millis(500),
///     action: BrowserAction::RetryProviderLoad
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Loaded { value: i32 },
        Retry,
    }

    #[tokio::test]
    async fn async_effect_wraps_the_block() {
        let effect = async_effect! {
            Some(TestAction::Loaded { value: 42 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds Effect::Future");
        };
        assert_eq!(fut.await, Some(TestAction::Loaded { value: 42 }));
    }

    #[test]
    fn delay_macro_boxes_the_action() {
        let effect = delay! {
            duration: Duration::from_millis(250),
            action: TestAction::Retry
        };

        match effect {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_millis(250));
                assert_eq!(*action, TestAction::Retry);
            },
            other => unreachable!("expected Effect::Delay, got {other:?}"),
        }
    }
}
