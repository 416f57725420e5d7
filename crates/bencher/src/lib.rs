/// A named wire fixture fed to a decoder benchmark.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    kind: MessageKind,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, kind: MessageKind, file: TestFile) -> Self {
        Self { name, kind, file }
    }

    pub fn request(name: &'static str, file: TestFile) -> Self {
        Self::new(name, MessageKind::Request, file)
    }

    pub fn response(name: &'static str, file: TestFile) -> Self {
        Self::new(name, MessageKind::Response, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// Wire length in bytes, for throughput reporting.
    pub fn wire_len(&self) -> u64 {
        self.file.wire.len() as u64
    }
}

/// A wire fixture embedded with `include_bytes!`, CRLF line endings preserved.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    wire: &'static [u8],
}

impl TestFile {
    pub const fn new(file_name: &'static str, wire: &'static [u8]) -> Self {
        Self { file_name, wire }
    }

    pub fn wire(&self) -> &'static [u8] {
        self.wire
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

/// Which decoder a fixture is meant for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}
