//! Name-keyed animation factory.

use crate::animation::{
    Animation, BuildContext, FadeText, PulsingText, ScrollingText, StaticText, TypewriterText,
};
use crate::config::AnimationConfig;
use crate::error::{LedseqError, Result};
use std::collections::HashMap;

/// Builds one animation type from validated options.
pub type Constructor =
    Box<dyn Fn(&AnimationConfig, &BuildContext) -> Result<Box<dyn Animation>> + Send + Sync>;

/// Maps declared type names to constructors. Holds no instances.
#[derive(Default)]
pub struct AnimationRegistry {
    constructors: HashMap<String, Constructor>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `static`, `scrolling`, `typewriter`, `fade` and `pulsing`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [(&str, Constructor); 5] = [
            ("static", constructor(StaticText::from_config)),
            ("scrolling", constructor(ScrollingText::from_config)),
            ("typewriter", constructor(TypewriterText::from_config)),
            ("fade", constructor(FadeText::from_config)),
            ("pulsing", constructor(PulsingText::from_config)),
        ];
        for (name, constructor) in builtin {
            registry.constructors.insert(name.to_string(), constructor);
        }
        registry
    }

    /// Register a constructor under `type_name`. Names are unique.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&AnimationConfig, &BuildContext) -> Result<Box<dyn Animation>> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.constructors.contains_key(&type_name) {
            return Err(LedseqError::DuplicateType { name: type_name });
        }
        self.constructors.insert(type_name, Box::new(constructor));
        Ok(())
    }

    pub fn create(
        &self,
        type_name: &str,
        config: &AnimationConfig,
        ctx: &BuildContext,
    ) -> Result<Box<dyn Animation>> {
        let constructor =
            self.constructors
                .get(type_name)
                .ok_or_else(|| LedseqError::UnknownAnimationType {
                    name: type_name.to_string(),
                })?;
        constructor(config, ctx)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Box a typed constructor as a [`Constructor`].
pub fn constructor<A, F>(build: F) -> Constructor
where
    A: Animation + 'static,
    F: Fn(&AnimationConfig, &BuildContext) -> Result<A> + Send + Sync + 'static,
{
    Box::new(move |config: &AnimationConfig, ctx: &BuildContext| {
        Ok(Box::new(build(config, ctx)?) as Box<dyn Animation>)
    })
}

impl std::fmt::Debug for AnimationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationRegistry")
            .field("types", &self.names())
            .finish()
    }
}
