use ahash::AHashMap;

use crate::NodeHandle;

///Index of an interned [DebugGroup].
pub type DebugGroupId = usize;

///Named, colored debug scope. Only used for tooling.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugGroup {
    pub name: String,
    pub color: [f32; 4],
}

//f32 is neither Eq nor Hash, so groups are interned by the bit pattern of their color.
#[derive(Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    name: String,
    color: [u32; 4],
}

impl GroupKey {
    fn new(name: &str, color: [f32; 4]) -> Self {
        GroupKey {
            name: name.to_owned(),
            color: color.map(f32::to_bits),
        }
    }
}

///Debug group bookkeeping of a render graph.
///
/// Groups are interned by value. Every distinct group stack that had at least one node added under it is stored
/// once in the *used groups* table, and each node remembers the index of the stack it was added under. That way
/// the full group path of any node can be rebuilt after recording.
///
/// Interned groups and used stacks survive [reset_nodes](Self::reset_nodes), so ids stay stable across frames.
/// While capturing is disabled groups are neither interned nor attributed to nodes. The stack itself is still
/// pushed and popped, so toggling capture between a `begin` and its `end` keeps it balanced.
pub struct DebugContext {
    enabled: bool,
    groups: Vec<DebugGroup>,
    group_ids: AHashMap<GroupKey, DebugGroupId>,
    ///`None` for groups begun while capture was disabled.
    group_stack: Vec<Option<DebugGroupId>>,
    ///True if the current stack was already snapshotted into `used_groups`.
    group_used: bool,
    current_used: usize,
    used_groups: Vec<Vec<DebugGroupId>>,
    used_group_ids: AHashMap<Vec<DebugGroupId>, usize>,
    node_group_map: Vec<Option<usize>>,
}

impl DebugContext {
    ///Separator used by [full_group](Self::full_group).
    pub const SEPARATOR: &'static str = ".";

    pub fn new(enabled: bool) -> Self {
        DebugContext {
            enabled,
            groups: Vec::new(),
            group_ids: AHashMap::default(),
            group_stack: Vec::new(),
            group_used: false,
            current_used: 0,
            used_groups: Vec::new(),
            used_group_ids: AHashMap::default(),
            node_group_map: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.group_used = false;
    }

    fn intern(&mut self, name: &str, color: [f32; 4]) -> DebugGroupId {
        let key = GroupKey::new(name, color);
        if let Some(id) = self.group_ids.get(&key) {
            return *id;
        }
        let id = self.groups.len();
        self.groups.push(DebugGroup {
            name: name.to_owned(),
            color,
        });
        self.group_ids.insert(key, id);
        id
    }

    pub fn begin(&mut self, name: &str, color: [f32; 4]) {
        let id = if self.enabled {
            Some(self.intern(name, color))
        } else {
            None
        };
        self.group_stack.push(id);
        self.group_used = false;
    }

    pub fn end(&mut self) {
        if self.group_stack.pop().is_none() {
            #[cfg(feature = "logging")]
            log::warn!("Debug group end without matching begin");
        }
        //the stack changed, next node needs a new snapshot
        self.group_used = false;
    }

    ///Attributes `node` to the current group stack.
    pub(crate) fn record_node(&mut self, node: NodeHandle) {
        if !self.enabled {
            return;
        }
        if !self.group_used {
            let stack = self.group_stack.iter().flatten().copied().collect::<Vec<_>>();
            self.current_used = match self.used_group_ids.get(&stack) {
                Some(index) => *index,
                None => {
                    let index = self.used_groups.len();
                    self.used_groups.push(stack.clone());
                    self.used_group_ids.insert(stack, index);
                    index
                }
            };
            self.group_used = true;
        }

        let index = node.index();
        if self.node_group_map.len() <= index {
            self.node_group_map.resize(index + 1, None);
        }
        self.node_group_map[index] = Some(self.current_used);
    }

    fn used_stack(&self, node: NodeHandle) -> Option<&[DebugGroupId]> {
        self.node_group_map
            .get(node.index())
            .copied()
            .flatten()
            .map(|used| self.used_groups[used].as_slice())
    }

    ///Dotted path of all group names active when `node` was added. Empty if nothing was captured.
    pub fn full_group(&self, node: NodeHandle) -> String {
        self.used_stack(node)
            .map(|stack| {
                stack
                    .iter()
                    .map(|id| self.groups[*id].name.as_str())
                    .collect::<Vec<_>>()
                    .join(Self::SEPARATOR)
            })
            .unwrap_or_default()
    }

    ///Color of the innermost group `node` was added under.
    pub fn group_color(&self, node: NodeHandle) -> Option<[f32; 4]> {
        self.used_stack(node)
            .and_then(|stack| stack.last())
            .map(|id| self.groups[*id].color)
    }

    pub fn group(&self, id: DebugGroupId) -> Option<&DebugGroup> {
        self.groups.get(id)
    }

    ///Current nesting depth.
    pub fn depth(&self) -> usize {
        self.group_stack.len()
    }

    ///Forgets the node attribution. Interned groups and used stacks are kept.
    pub(crate) fn reset_nodes(&mut self) {
        self.node_group_map.clear();
    }
}
