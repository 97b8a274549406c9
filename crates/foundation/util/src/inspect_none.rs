/// The missing counterpart of [`Option::inspect`], for running a side effect
/// (usually logging) when a lookup comes back empty.
pub trait InspectNone {
    /// Calls `f` if `self` is `None`, then returns `self` unchanged.
    fn inspect_none<F: FnOnce()>(self, f: F) -> Self;
}

impl<T> InspectNone for Option<T> {
    #[inline]
    fn inspect_none<F: FnOnce()>(self, f: F) -> Self {
        if self.is_none() {
            f();
        }
        self
    }
}


#[cfg(test)]
mod tests {
    use super::InspectNone as _;

    #[test]
    fn only_runs_for_none() {
        let mut calls = 0;

        let some = Some(3).inspect_none(|| calls += 1);
        assert_eq!(some, Some(3));
        assert_eq!(calls, 0);

        let none = None::<u8>.inspect_none(|| calls += 1);
        assert_eq!(none, None);
        assert_eq!(calls, 1);
    }
}
