use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::types::{ParamDeclId, TemplateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasTemplateId(pub usize);

/// What a declared name denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Namespace(ScopeId),
    /// `scope` is the member scope once the definition has been seen.
    Record { qualified: String, scope: Option<ScopeId> },
    Enum(String),
    ClassTemplate(TemplateId),
    AliasTemplate(AliasTemplateId),
    Alias(AliasId),
    Param(ParamDeclId),
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    /// Qualifier for names declared here (`ns::Outer`), empty at global scope.
    prefix: String,
    names: HashMap<String, Entity>,
}

/// Arena of nested declaration scopes. Scope 0 is the global namespace.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Self { scopes: vec![Scope { parent: None, prefix: String::new(), names: HashMap::new() }] }
    }

    pub fn push(&mut self, parent: ScopeId, prefix: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope { parent: Some(parent), prefix: prefix.into(), names: HashMap::new() });
        id
    }

    pub fn prefix(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].prefix
    }

    pub fn qualify(&self, scope: ScopeId, name: &str) -> String {
        let prefix = self.prefix(scope);
        if prefix.is_empty() { name.to_string() } else { format!("{prefix}::{name}") }
    }

    /// Declares `name` unless it is already taken. A record definition
    /// replaces its own forward declaration; everything else keeps the first
    /// entity (`typedef struct S S;` stays the record).
    pub fn declare(&mut self, scope: ScopeId, name: &str, entity: Entity) -> bool {
        match self.scopes[scope.0].names.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
            Entry::Occupied(mut slot) => {
                let upgrade = matches!(
                    (slot.get(), &entity),
                    (Entity::Record { scope: None, .. }, Entity::Record { scope: Some(_), .. })
                );
                if upgrade {
                    slot.insert(entity);
                }
                upgrade
            }
        }
    }

    pub fn get_local(&self, scope: ScopeId, name: &str) -> Option<&Entity> {
        self.scopes[scope.0].names.get(name)
    }

    /// Unqualified lookup: innermost scope outward.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Entity> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.0];
            if let Some(entity) = s.names.get(name) {
                return Some(entity);
            }
            current = s.parent;
        }
        None
    }
}
