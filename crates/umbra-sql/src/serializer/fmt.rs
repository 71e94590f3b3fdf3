use super::{Formatter, Params};

macro_rules! fmt {
    ($f:expr, $( $fragments:expr ),* $(,)?) => {{
        $(
            $fragments.to_sql($f);
        )*
    }};
}

pub(crate) trait ToSql {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>);
}

impl ToSql for &str {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        f.dst.push_str(self);
    }
}

impl ToSql for &String {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        f.dst.push_str(self);
    }
}

impl ToSql for char {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        f.dst.push(self);
    }
}

impl ToSql for u32 {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        use std::fmt::Write;
        write!(f.dst, "{self}").unwrap();
    }
}

impl ToSql for u64 {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        use std::fmt::Write;
        write!(f.dst, "{self}").unwrap();
    }
}

impl ToSql for usize {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        use std::fmt::Write;
        write!(f.dst, "{self}").unwrap();
    }
}

impl<A: ToSql, B: ToSql> ToSql for (A, B) {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        self.0.to_sql(f);
        self.1.to_sql(f);
    }
}

impl<A: ToSql, B: ToSql, C: ToSql> ToSql for (A, B, C) {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        self.0.to_sql(f);
        self.1.to_sql(f);
        self.2.to_sql(f);
    }
}

impl<A: ToSql> ToSql for Option<A> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        if let Some(inner) = self {
            inner.to_sql(f);
        }
    }
}
