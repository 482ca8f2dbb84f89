//! Scripted in-process server half for session-flow tests. Speaks the
//! server side of the native protocol over an in-memory duplex stream
//! using the crate's own wire primitives.

use tokio::io::{split, DuplexStream, ReadHalf, WriteHalf};

use ch_native::compress::{CompressionMethod, DEFAULT_BLOCK_SIZE};
use ch_native::protocol::block::{read_block, write_block};
use ch_native::protocol::Block;
use ch_native::wire::reader::ProtocolReader;
use ch_native::wire::writer::ProtocolWriter;

pub const LIMIT: usize = 1 << 26;

const SERVER_HELLO: u64 = 0;
const SERVER_DATA: u64 = 1;
const SERVER_EXCEPTION: u64 = 2;
const SERVER_PROGRESS: u64 = 3;
const SERVER_PONG: u64 = 4;
const SERVER_END_OF_STREAM: u64 = 5;

pub struct ServerHarness {
    pub reader: ProtocolReader<ReadHalf<DuplexStream>>,
    pub writer: ProtocolWriter<WriteHalf<DuplexStream>>,
    /// Compression flag announced by the client's query message.
    pub compression: bool,
}

impl ServerHarness {
    pub fn new(stream: DuplexStream) -> Self {
        let (read_half, write_half) = split(stream);
        Self {
            reader: ProtocolReader::new(read_half, LIMIT, None),
            writer: ProtocolWriter::new(write_half, LIMIT, None),
            compression: false,
        }
    }

    /// Consumes the client Hello and answers with a server Hello carrying
    /// `revision`.
    pub async fn handshake(&mut self, revision: u64) -> (String, String, String) {
        let opcode = self.reader.read_varint().await.expect("client opcode");
        assert_eq!(opcode, 0, "expected client hello");
        let _client_name = self.reader.read_string().await.expect("client name");
        let _major = self.reader.read_varint().await.expect("major");
        let _minor = self.reader.read_varint().await.expect("minor");
        let client_revision = self.reader.read_varint().await.expect("revision");
        assert!(client_revision >= 54_453, "client revision {client_revision}");
        let database = self.reader.read_string().await.expect("database");
        let user = self.reader.read_string().await.expect("user");
        let password = self.reader.read_string().await.expect("password");

        let w = &mut self.writer;
        w.write_varint(SERVER_HELLO).expect("opcode");
        w.write_string("ClickHouse").expect("name");
        w.write_varint(23).expect("major");
        w.write_varint(3).expect("minor");
        w.write_varint(revision).expect("revision");
        w.write_string("UTC").expect("timezone");
        w.write_string("fake-server").expect("display name");
        w.write_varint(1).expect("patch");
        w.flush().await.expect("flush hello");

        (database, user, password)
    }

    /// Reads a full client Query message plus its trailing external-tables
    /// terminator block, returning the query text.
    pub async fn read_query(&mut self) -> String {
        let opcode = self.reader.read_varint().await.expect("opcode");
        assert_eq!(opcode, 1, "expected client query");
        let _query_id = self.reader.read_string().await.expect("query id");

        let kind = self.reader.read_varint().await.expect("kind");
        assert_eq!(kind, 1, "initial query");
        for _ in 0..3 {
            let _ = self.reader.read_string().await.expect("initial triple");
        }
        let mut start_time = [0u8; 8];
        self.reader.read_exact(&mut start_time).await.expect("start time");
        let _interface = self.reader.read_varint().await.expect("interface");
        for _ in 0..3 {
            let _ = self.reader.read_string().await.expect("host triple");
        }
        for _ in 0..3 {
            let _ = self.reader.read_varint().await.expect("version triple");
        }
        let _quota_key = self.reader.read_string().await.expect("quota key");
        let _depth = self.reader.read_varint().await.expect("distributed depth");
        let _build = self.reader.read_varint().await.expect("build");
        let otel = self.reader.read_u8().await.expect("otel");
        assert_eq!(otel, 0);
        for _ in 0..3 {
            let _ = self.reader.read_varint().await.expect("replica zeros");
        }

        loop {
            let key = self.reader.read_string().await.expect("setting key");
            if key.is_empty() {
                break;
            }
            let _flags = self.reader.read_varint().await.expect("setting flags");
            let _value = self.reader.read_string().await.expect("setting value");
        }
        let _secret = self.reader.read_string().await.expect("secret");
        let stage = self.reader.read_varint().await.expect("stage");
        assert_eq!(stage, 2, "complete stage");
        self.compression = self.reader.read_u8().await.expect("compression") != 0;
        let query = self.reader.read_string().await.expect("query text");

        // External-tables terminator.
        let block = self.read_data_block().await;
        assert_eq!(block.row_count(), 0, "external tables block must be empty");

        query
    }

    /// Reads one client Data message.
    pub async fn read_data_block(&mut self) -> Block {
        let opcode = self.reader.read_varint().await.expect("data opcode");
        assert_eq!(opcode, 2, "expected client data");
        let _temp_table = self.reader.read_string().await.expect("temp table");
        if self.compression {
            self.reader.begin_decompress();
            let block = read_block(&mut self.reader, &[]).await.expect("block");
            self.reader.end_decompress();
            block
        } else {
            read_block(&mut self.reader, &[]).await.expect("block")
        }
    }

    pub async fn read_ping(&mut self) {
        let opcode = self.reader.read_varint().await.expect("opcode");
        assert_eq!(opcode, 4, "expected ping");
    }

    pub async fn read_cancel(&mut self) {
        let opcode = self.reader.read_varint().await.expect("opcode");
        assert_eq!(opcode, 3, "expected cancel");
    }

    pub async fn send_pong(&mut self) {
        self.writer.write_varint(SERVER_PONG).expect("pong");
        self.writer.flush().await.expect("flush");
    }

    pub async fn send_block(&mut self, block: &Block) {
        let w = &mut self.writer;
        w.write_varint(SERVER_DATA).expect("opcode");
        w.write_string("").expect("temp table");
        if self.compression {
            w.begin_compress(CompressionMethod::Lz4, DEFAULT_BLOCK_SIZE)
                .expect("begin compress");
            write_block(w, block).expect("block");
            w.end_compress().expect("end compress");
        } else {
            write_block(w, block).expect("block");
        }
        w.flush().await.expect("flush");
    }

    pub async fn send_progress(&mut self, rows: u64, bytes: u64) {
        let w = &mut self.writer;
        w.write_varint(SERVER_PROGRESS).expect("opcode");
        w.write_varint(rows).expect("rows");
        w.write_varint(bytes).expect("bytes");
        w.write_varint(0).expect("total rows");
        w.write_varint(0).expect("written rows");
        w.write_varint(0).expect("written bytes");
        w.flush().await.expect("flush");
    }

    pub async fn send_eos(&mut self) {
        self.writer
            .write_varint(SERVER_END_OF_STREAM)
            .expect("eos");
        self.writer.flush().await.expect("flush");
    }

    pub async fn send_exception(&mut self, code: i32, message: &str) {
        let w = &mut self.writer;
        w.write_varint(SERVER_EXCEPTION).expect("opcode");
        w.write_i32(code).expect("code");
        w.write_string("DB::Exception").expect("name");
        w.write_string(message).expect("message");
        w.write_string("").expect("stack");
        w.write_u8(0).expect("nested");
        w.flush().await.expect("flush");
    }
}
