use crate::utils::*;

impl Buffer {
    /// Returns `true` if the buffer is excluded from scheduling.
    pub fn is_pinned(&self) -> bool {
        self.class == StorageClass::Pinned
    }

    /// The offset the engine settled on, once [`BufferArena::apply`] has
    /// run. `None` until then.
    pub fn assigned_offset(&self) -> Option<Bytes> {
        self.assigned_offset
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Buffer {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        self.id.hash(state);
    }
}

impl BufferArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buffer without tensor metadata and returns its handle.
    pub fn add(&mut self, name: impl Into<String>, size_bytes: Bytes, class: StorageClass) -> BufferId {
        self.add_tensor(name, size_bytes, class, vec![], vec![])
    }

    /// Registers a buffer together with the shape/stride metadata carried
    /// into the diagnostic timeline.
    pub fn add_tensor(
        &mut self,
        name:       impl Into<String>,
        size_bytes: Bytes,
        class:      StorageClass,
        shape:      Vec<usize>,
        strides:    Vec<usize>,
    ) -> BufferId {
        let id = self.bufs.len() as BufferId;
        self.bufs.push(Buffer {
            id,
            name: name.into(),
            size_bytes,
            class,
            shape,
            strides,
            assigned_offset: None,
        });

        id
    }

    pub fn get(&self, id: BufferId) -> &Buffer {
        &self.bufs[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.bufs.iter()
    }

    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }

    /// Folds a successful [`Assignment`] into the buffer descriptors, so
    /// that downstream code generation reads concrete addresses off them.
    ///
    /// Each buffer's offset is written at most once over its lifetime in
    /// the compiled artifact. A second write is a defect in the calling
    /// pass and panics rather than silently re-basing live addresses.
    pub fn apply(&mut self, assignment: &Assignment) {
        for (id, offset) in assignment.iter() {
            let buf = &mut self.bufs[id as usize];
            assert!(
                buf.assigned_offset.is_none(),
                "buffer {} ({}) was assigned twice",
                buf.id,
                buf.name
            );
            buf.assigned_offset = Some(offset);
        }
    }
}
