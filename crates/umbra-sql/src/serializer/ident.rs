use super::{Formatter, Params, ToSql};

/// An identifier, serialized double-quoted with embedded quotes doubled.
pub(crate) struct Ident<S>(pub(crate) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let name = self.0.as_ref();
        f.dst.push('"');
        for ch in name.chars() {
            if ch == '"' {
                f.dst.push('"');
            }
            f.dst.push(ch);
        }
        f.dst.push('"');
    }
}
