/// Implements the [`Object`] plumbing for a type wrapping a [`Base`].
///
/// Implements the following traits:
///
/// * `AsRef<Base>`
/// * `AsMut<Base>`
/// * `Object`
///
/// If the field parameter is omitted then the field name defaults to `object`.
///
/// [`Object`]: object/trait.Object.html
/// [`Base`]: object/struct.Base.html
macro_rules! mimic_object {
    ($($name:ident),*) => {
        mimic_object!($($name::object),*);
    };
    ($($name:ident::$field:ident),*) => {
        $(
            impl AsRef<$crate::object::Base> for $name {
                fn as_ref(&self) -> &$crate::object::Base {
                    &self.$field
                }
            }

            impl AsMut<$crate::object::Base> for $name {
                fn as_mut(&mut self) -> &mut $crate::object::Base {
                    &mut self.$field
                }
            }

            impl $crate::object::Object for $name {}
        )*
    };
}
