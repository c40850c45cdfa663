//! Frame serialization, written straight into the caller's buffer.

use bytes::{BufMut, BytesMut};

use crate::types::Frame;

impl Frame {
    /// Appends this frame's wire encoding to `buf`.
    pub fn serialize(&self, buf: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Frame::Error(msg) => {
                buf.put_u8(b'-');
                buf.put_slice(msg.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Frame::Integer(n) => {
                buf.put_u8(b':');
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            Frame::Bulk(data) => {
                buf.put_u8(b'$');
                buf.put_slice(data.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            Frame::NullBulk => buf.put_slice(b"$-1\r\n"),
            Frame::Array(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    item.serialize(buf);
                }
            }
            Frame::NullArray => buf.put_slice(b"*-1\r\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn encoded(frame: Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        frame.serialize(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn scalar_frames() {
        assert_eq!(encoded(Frame::Simple("OK".into())), b"+OK\r\n");
        assert_eq!(encoded(Frame::Error("ERR no".into())), b"-ERR no\r\n");
        assert_eq!(encoded(Frame::Integer(-42)), b":-42\r\n");
    }

    #[test]
    fn bulk_frames() {
        assert_eq!(
            encoded(Frame::Bulk(Bytes::from("hello"))),
            b"$5\r\nhello\r\n"
        );
        assert_eq!(encoded(Frame::Bulk(Bytes::new())), b"$0\r\n\r\n");
        assert_eq!(encoded(Frame::NullBulk), b"$-1\r\n");
    }

    #[test]
    fn array_frames() {
        assert_eq!(
            encoded(Frame::Array(vec![Frame::Integer(1), Frame::bulk("x")])),
            b"*2\r\n:1\r\n$1\r\nx\r\n"
        );
        assert_eq!(encoded(Frame::Array(vec![])), b"*0\r\n");
        assert_eq!(encoded(Frame::NullArray), b"*-1\r\n");
    }

    #[test]
    fn serialization_appends() {
        let mut buf = BytesMut::new();
        Frame::Simple("a".into()).serialize(&mut buf);
        Frame::Simple("b".into()).serialize(&mut buf);
        assert_eq!(&buf[..], b"+a\r\n+b\r\n");
    }
}
