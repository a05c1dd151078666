use crate::cursor::Primitive;
use crate::element::Element;
use crate::error::Result;
use crate::reader::Reader;

macro_rules! impl_primitive_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
                    Ok(Some(<$ty as Primitive>::SIZE))
                }

                fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
                    reader.read_int(symbol)
                }
            }
        )*
    };
}

impl_primitive_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Element for bool {
    fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
        Ok(Some(1))
    }

    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        reader.read_tag::<u8, _>(symbol, |raw| match raw {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        })
    }
}

/// Text running to the end of the enclosing frame
impl Element for String {
    fn read_frame(reader: &mut Reader<'_>, symbol: &'static str) -> Result<Self> {
        let end = reader.frame_end();
        let config = reader.config();
        reader
            .cursor_mut()
            .read_string(end, config.text_encoding, config.text_decoding, symbol)
    }
}

/// Nothing at all, for fields that exist only through their side effects
impl Element for () {
    fn upper_bound(_reader: &Reader<'_>) -> Result<Option<usize>> {
        Ok(Some(0))
    }

    fn read_frame(_reader: &mut Reader<'_>, _symbol: &'static str) -> Result<Self> {
        Ok(())
    }
}
