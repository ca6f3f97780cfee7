//! String-addressed numeric member access.
//!
//! Every type that can be queried registers a [`TypeInfo`]: its data members,
//! its zero-argument accessors and its direct bases. Lookups go data member
//! first, then accessor, then each base in declaration order, so a member of
//! a grandparent is found from the derived type.
//!
//! ```
//! use at_core::objects::{Candidate, RecoMuon, Muon};
//! use at_core::reflect::TypeRegistry;
//!
//! let registry = TypeRegistry::with_builtin_types();
//! let reco = RecoMuon { candidate: Candidate::new(42.0, 0.1, 0.2), ..Default::default() };
//! let muon = Muon::new(reco, None, 0.1);
//! let pt = registry.get_numeric_member("osu::Muon", &muon, "pt").unwrap();
//! assert_eq!(pt, 42.0);
//! ```

mod builtin;

use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Returned when a member exists but its kind is not numeric.
pub const UNSUPPORTED_KIND_SENTINEL: f64 = i32::MIN as f64;

/// A member value tagged with its primitive kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberValue {
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `long double`
    LongDouble(f64),
    /// `char`
    Char(i8),
    /// `int`
    Int(i32),
    /// `unsigned`
    Unsigned(u32),
    /// `bool`
    Bool(bool),
    /// Any non-numeric kind, named by its type.
    Other(&'static str),
}

impl MemberValue {
    /// Name of the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::LongDouble(_) => "long double",
            Self::Char(_) => "char",
            Self::Int(_) => "int",
            Self::Unsigned(_) => "unsigned",
            Self::Bool(_) => "bool",
            Self::Other(name) => name,
        }
    }

    /// Numeric value, `None` for [`MemberValue::Other`].
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) | Self::LongDouble(v) => Some(v),
            Self::Char(v) => Some(f64::from(v)),
            Self::Int(v) => Some(f64::from(v)),
            Self::Unsigned(v) => Some(f64::from(v)),
            Self::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            Self::Other(_) => None,
        }
    }
}

trait Getter: Send + Sync {
    fn get(&self, object: &dyn Any) -> Option<MemberValue>;
}

struct FnGetter<T>(fn(&T) -> MemberValue);

impl<T: Any> Getter for FnGetter<T> {
    fn get(&self, object: &dyn Any) -> Option<MemberValue> {
        object.downcast_ref::<T>().map(self.0)
    }
}

trait Projection: Send + Sync {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any>;
}

struct FnProjection<T, B>(fn(&T) -> &B);

impl<T: Any, B: Any> Projection for FnProjection<T, B> {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any> {
        let t = object.downcast_ref::<T>()?;
        Some((self.0)(t) as &dyn Any)
    }
}

/// A direct base of a registered type.
pub struct BaseInfo {
    name: &'static str,
    scope: &'static [&'static str],
    projection: Box<dyn Projection>,
}

impl BaseInfo {
    /// Unqualified base name as written in the derived type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Base name qualified with its declaring scope chain.
    pub fn qualified_name(&self) -> String {
        qualify(self.scope, self.name)
    }
}

impl std::fmt::Debug for BaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseInfo").field("name", &self.qualified_name()).finish()
    }
}

fn qualify(scope: &[&str], name: &str) -> String {
    scope.iter().copied().chain(std::iter::once(name)).collect::<Vec<_>>().join("::")
}

/// Descriptor of one registered type.
pub struct TypeInfo {
    name: String,
    type_id: TypeId,
    data_members: Vec<(&'static str, Box<dyn Getter>)>,
    methods: Vec<(&'static str, Box<dyn Getter>)>,
    bases: Vec<BaseInfo>,
}

impl TypeInfo {
    /// Start a descriptor for `T` named `name` inside `scope`.
    pub fn builder<T: Any>(scope: &'static [&'static str], name: &str) -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            info: TypeInfo {
                name: qualify(scope, name),
                type_id: TypeId::of::<T>(),
                data_members: Vec::new(),
                methods: Vec::new(),
                bases: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data member names.
    pub fn data_member_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_members.iter().map(|(n, _)| *n)
    }

    /// Accessor names.
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|(n, _)| *n)
    }

    /// Direct bases in declaration order.
    pub fn bases(&self) -> &[BaseInfo] {
        &self.bases
    }

    fn data_member(&self, name: &str) -> Option<&dyn Getter> {
        self.data_members.iter().find(|(n, _)| *n == name).map(|(_, g)| g.as_ref())
    }

    fn method(&self, name: &str) -> Option<&dyn Getter> {
        self.methods.iter().find(|(n, _)| *n == name).map(|(_, g)| g.as_ref())
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("data_members", &self.data_member_names().collect::<Vec<_>>())
            .field("methods", &self.method_names().collect::<Vec<_>>())
            .field("bases", &self.bases)
            .finish()
    }
}

/// Builder returned by [`TypeInfo::builder`].
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> TypeInfoBuilder<T> {
    /// Register a data member.
    pub fn data_member(mut self, name: &'static str, get: fn(&T) -> MemberValue) -> Self {
        self.info.data_members.push((name, Box::new(FnGetter(get))));
        self
    }

    /// Register a zero-argument accessor.
    pub fn method(mut self, name: &'static str, get: fn(&T) -> MemberValue) -> Self {
        self.info.methods.push((name, Box::new(FnGetter(get))));
        self
    }

    /// Register a direct base named `name` declared in `scope`.
    pub fn base<B: Any>(mut self, scope: &'static [&'static str], name: &'static str, project: fn(&T) -> &B) -> Self {
        self.info.bases.push(BaseInfo { name, scope, projection: Box::new(FnProjection(project)) });
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> TypeInfo {
        self.info
    }
}

/// Types that describe themselves to a [`TypeRegistry`].
pub trait Reflect: Any {
    /// Descriptor of this type.
    fn type_info() -> TypeInfo;
}

/// Fully qualified type name → descriptor.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeInfo>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every physics object of this crate.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        builtin::register_builtin_types(&mut registry);
        registry
    }

    /// Add or replace a descriptor.
    pub fn register(&mut self, info: TypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    /// Register a [`Reflect`] type.
    pub fn register_type<T: Reflect>(&mut self) {
        self.register(T::type_info());
    }

    /// Descriptor by qualified name.
    pub fn get(&self, type_name: &str) -> Option<&TypeInfo> {
        self.types.get(type_name)
    }

    /// Registered names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Numeric value of `member` on `object`, which must be a `type_name`.
    ///
    /// A member of a non-numeric kind logs a warning and yields
    /// [`UNSUPPORTED_KIND_SENTINEL`].
    pub fn get_numeric_member(&self, type_name: &str, object: &dyn Any, member: &str) -> Result<f64> {
        let unresolved = || Error::UnresolvedMember { type_name: type_name.to_string(), member: member.to_string() };
        let Some(info) = self.types.get(type_name) else {
            return Err(unresolved());
        };
        if (*object).type_id() != info.type_id {
            return Err(Error::ObjectTypeMismatch { type_name: type_name.to_string() });
        }
        let mismatch = || Error::ObjectTypeMismatch { type_name: type_name.to_string() };

        if let Some(getter) = info.data_member(member) {
            let value = getter.get(object).ok_or_else(mismatch)?;
            return Ok(numeric_or_sentinel(member, value, false));
        }
        if let Some(getter) = info.method(member) {
            let value = getter.get(object).ok_or_else(mismatch)?;
            return Ok(numeric_or_sentinel(member, value, true));
        }

        for base in &info.bases {
            let Some(sub) = base.projection.project(object) else {
                continue;
            };
            if let Ok(v) = self.get_numeric_member(&base.qualified_name(), sub, member) {
                return Ok(v);
            }
        }
        Err(unresolved())
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.type_names()).finish()
    }
}

fn numeric_or_sentinel(member: &str, value: MemberValue, is_method: bool) -> f64 {
    value.to_f64().unwrap_or_else(|| {
        if is_method {
            log::warn!("\"{member}()\" has unrecognized return type \"{}\"", value.kind());
        } else {
            log::warn!("\"{member}\" has unrecognized type \"{}\"", value.kind());
        }
        UNSUPPORTED_KIND_SENTINEL
    })
}
