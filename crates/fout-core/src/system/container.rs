/// An element whose class list can be extended.
pub trait ClassList {
    /// Add `class` to the element. Adding a class that is already present is
    /// a no-op.
    fn add_class(&self, class: &str);

    fn has_class(&self, class: &str) -> bool;
}
