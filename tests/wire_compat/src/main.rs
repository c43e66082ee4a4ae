fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use quicdrop_protocol::{MemoryStream, TransferHeader, TransferStream, wire};
    use serde::Deserialize;

    const CAPACITY: usize = 1024 * 1024;

    /// Byte-exact capture of one transfer stream.
    #[derive(Debug, Deserialize)]
    struct WireFixture {
        #[allow(dead_code)]
        description: String,
        filename: String,
        file_size: u32,
        body_hex: String,
        stream_hex: String,
    }

    impl WireFixture {
        fn header(&self) -> TransferHeader {
            TransferHeader {
                filename: self.filename.clone(),
                file_size: self.file_size,
            }
        }

        fn body(&self) -> Vec<u8> {
            hex::decode(&self.body_hex).expect("body_hex is valid hex")
        }

        fn stream(&self) -> Vec<u8> {
            hex::decode(&self.stream_hex).expect("stream_hex is valid hex")
        }
    }

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> WireFixture {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn drain(stream: &mut MemoryStream) -> Vec<u8> {
        let mut out = vec![0u8; stream.read_buffered_amount()];
        let result = stream.read_into(&mut out).unwrap();
        out.truncate(result.amount);
        out
    }

    /// Encodes the fixture's header and body and compares against the capture.
    async fn assert_encodes(name: &str) {
        let fixture = load_fixture(name);
        let (mut tx, mut rx) = MemoryStream::pair(CAPACITY);

        wire::write_header(&mut tx, &fixture.header()).await.unwrap();
        let body = fixture.body();
        if !body.is_empty() {
            tx.write(&body).unwrap();
        }
        tx.finish().unwrap();

        let encoded = drain(&mut rx);
        assert_eq!(
            hex::encode(&encoded),
            fixture.stream_hex,
            "encoding mismatch for {name}"
        );
    }

    /// Decodes the captured bytes and compares against the fixture fields.
    async fn assert_decodes(name: &str) {
        let fixture = load_fixture(name);
        let (mut tx, mut rx) = MemoryStream::pair(CAPACITY);
        tx.write(&fixture.stream()).unwrap();
        tx.finish().unwrap();

        let header = wire::read_header(&mut rx).await.unwrap();
        assert_eq!(header, fixture.header(), "header mismatch for {name}");

        let body = drain(&mut rx);
        assert_eq!(body.len(), fixture.file_size as usize);
        assert_eq!(body, fixture.body(), "body mismatch for {name}");

        let mut rest = [0u8; 1];
        let end = rx.read_into(&mut rest).unwrap();
        assert_eq!(end.amount, 0);
        assert!(end.finished, "stream should end right after the body");
    }

    #[tokio::test]
    async fn fixture_ascii_name() {
        assert_encodes("ascii_name.json").await;
        assert_decodes("ascii_name.json").await;
    }

    #[tokio::test]
    async fn fixture_unicode_name() {
        assert_encodes("unicode_name.json").await;
        assert_decodes("unicode_name.json").await;
    }

    #[tokio::test]
    async fn fixture_empty_body() {
        assert_encodes("empty_body.json").await;
        assert_decodes("empty_body.json").await;
    }

    #[tokio::test]
    async fn fixture_size_byte_order() {
        let fixture = load_fixture("size_byte_order.json");
        let stream = fixture.stream();
        let name_len = fixture.filename.len();
        assert_eq!(&stream[4 + name_len..8 + name_len], &[0x02, 0x01, 0x00, 0x00]);

        assert_encodes("size_byte_order.json").await;
        assert_decodes("size_byte_order.json").await;
    }

    #[test]
    fn every_fixture_is_self_consistent() {
        let mut count = 0;
        for entry in fs::read_dir(fixtures_dir()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let fixture = load_fixture(&name);

            let name_len = fixture.filename.len();
            let stream = fixture.stream();
            assert_eq!(
                stream.len(),
                8 + name_len + fixture.file_size as usize,
                "length mismatch in {name}"
            );
            assert_eq!(&stream[..4], &(name_len as u32).to_le_bytes());
            assert_eq!(&stream[4..4 + name_len], fixture.filename.as_bytes());
            assert_eq!(&stream[8 + name_len..], &fixture.body()[..]);
            count += 1;
        }
        assert!(count >= 4, "expected at least 4 fixtures, found {count}");
    }
}
