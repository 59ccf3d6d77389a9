//! Node registry: symbolic names, roles and paths mapped to addresses.
//!
//! Entries are multi-valued per source key. Resolution returns every match;
//! when more than one match is flagged public, one public entry is chosen
//! uniformly at random so load spreads across advertised peers. Entries may
//! carry a share TTL (how long a directory may hand them out) and an end
//! time after which the periodic cleanup removes them.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use rand::Rng;

// Layer 3: Internal module imports
use crate::message::{Address, AddressFormat};

/// What kind of source key an entry is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    /// Plain node or alias name.
    Name(String),
    /// Role, stored without the leading `@`.
    Role(String),
    /// Virtual path, stored without the `#/` prefix and trailing slash.
    Path(String),
}

/// Feature flags and lifetimes attached to a registry entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Public entries participate in random selection and directory
    /// advertising.
    pub public: bool,
    /// Peers may contact the target directly instead of relaying.
    pub direct_mode: bool,
    /// How long a directory may share this entry.
    pub share_time: Option<Duration>,
    /// Absolute expiry; the cleanup tick removes entries past it.
    pub end_time: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: EntryKey,
    pub target: String,
    pub public: bool,
    pub direct_mode: bool,
    pub share_time: Option<Duration>,
    pub end_time: Option<Instant>,
}

/// Result of resolving an address through the registry.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    /// Concrete candidate addresses, already reduced by random-public
    /// selection.
    pub targets: Vec<String>,
    /// True when the address was an alias form (role or path) with no
    /// matching entry.
    pub unknown_alias: bool,
}

/// Per-scheduler registry of symbolic destinations.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh an entry. Registering the same (key, target)
    /// pair again updates the existing entry, so registration is
    /// idempotent.
    pub fn register(&mut self, key: EntryKey, target: impl Into<String>, options: RegisterOptions) {
        let target = target.into();
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.key == key && e.target == target)
        {
            existing.public = options.public;
            existing.direct_mode = options.direct_mode;
            existing.share_time = options.share_time;
            existing.end_time = options.end_time;
            return;
        }
        self.entries.push(RegistryEntry {
            key,
            target,
            public: options.public,
            direct_mode: options.direct_mode,
            share_time: options.share_time,
            end_time: options.end_time,
        });
    }

    /// True when any entry is registered under the given source string.
    pub fn is_registered(&self, source: &str) -> bool {
        let key = Self::key_for(&Address::parse(source));
        match key {
            Some(key) => self.entries.iter().any(|e| e.key == key),
            None => false,
        }
    }

    /// Resolve an address to its concrete candidates.
    ///
    /// Concrete default-form addresses pass through unchanged; raw names
    /// pass through when no alias entry shadows them; roles and paths with
    /// no entry report `unknown_alias`.
    pub fn resolve(&self, address: &Address) -> ResolveOutcome {
        match address.format() {
            AddressFormat::Empty => ResolveOutcome::default(),
            AddressFormat::Default => ResolveOutcome {
                targets: vec![address.to_string()],
                unknown_alias: false,
            },
            AddressFormat::Raw => {
                let matches = self.matching(&EntryKey::Name(address.node_name().to_owned()));
                if matches.is_empty() {
                    ResolveOutcome {
                        targets: vec![address.to_string()],
                        unknown_alias: false,
                    }
                } else {
                    ResolveOutcome {
                        targets: Self::select(matches),
                        unknown_alias: false,
                    }
                }
            }
            AddressFormat::Role => {
                let matches = self.matching(&EntryKey::Role(address.role_name().to_owned()));
                ResolveOutcome {
                    unknown_alias: matches.is_empty(),
                    targets: Self::select(matches),
                }
            }
            AddressFormat::VirtualPath => {
                let matches = self.matching(&EntryKey::Path(address.path().to_owned()));
                ResolveOutcome {
                    unknown_alias: matches.is_empty(),
                    targets: Self::select(matches),
                }
            }
        }
    }

    /// All entries for a role, optionally public-only, with their share
    /// TTLs. Used to answer `core.advertise`.
    pub fn entries_for_role(&self, role: &str, public_only: bool) -> Vec<(String, Option<Duration>)> {
        self.entries
            .iter()
            .filter(|e| e.key == EntryKey::Role(role.to_owned()))
            .filter(|e| !public_only || e.public)
            .map(|e| (e.target.clone(), e.share_time))
            .collect()
    }

    /// Drop entries whose end time has passed.
    pub fn validate_entries(&mut self) {
        let now = Instant::now();
        self.entries
            .retain(|e| e.end_time.map_or(true, |end| now < end));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registry key for a source address, by its surface form.
    pub fn key_for(source: &Address) -> Option<EntryKey> {
        match source.format() {
            AddressFormat::Role => Some(EntryKey::Role(source.role_name().to_owned())),
            AddressFormat::VirtualPath => Some(EntryKey::Path(source.path().to_owned())),
            AddressFormat::Default | AddressFormat::Raw => {
                Some(EntryKey::Name(source.node_name().to_owned()))
            }
            AddressFormat::Empty => None,
        }
    }

    fn matching(&self, key: &EntryKey) -> Vec<&RegistryEntry> {
        self.entries.iter().filter(|e| e.key == *key).collect()
    }

    /// Reduce candidates: several public entries mean "pick one at random";
    /// otherwise every candidate is returned for fan-out.
    fn select(matches: Vec<&RegistryEntry>) -> Vec<String> {
        let public: Vec<&&RegistryEntry> = matches.iter().filter(|e| e.public).collect();
        if public.len() > 1 {
            let pick = rand::thread_rng().gen_range(0..public.len());
            return vec![public[pick].target.clone()];
        }
        matches.iter().map(|e| e.target.clone()).collect()
    }
}
