//! The LIFO return-stack carried by every request/response, used by intermediate
//! routers (the multiplexer, component E) to find their way back to the client that
//! originated a forwarded request.

use crate::error::FrameError;
use crate::stream::{BitStreamReader, BitStreamWriter};

/// Wire size in bytes of one return-stack item: `u32 id` + `u32 info`.
pub const ITEM_WIRE_SIZE: u32 = 8;

/// Hard ceiling on the number of items a return stack may carry; the item count is
/// serialized as a single byte.
pub const MAX_ITEMS: usize = 255;

/// One hop's routing breadcrumb.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReturnStackItem {
    pub id: u32,
    pub info: u32,
}

impl ReturnStackItem {
    pub fn to_binary(&self, writer: &mut BitStreamWriter) -> Result<(), FrameError> {
        writer.write_uint32(self.id)?;
        writer.write_uint32(self.info)?;
        Ok(())
    }

    pub fn from_binary(reader: &mut BitStreamReader<'_>) -> Result<Self, FrameError> {
        Ok(ReturnStackItem {
            id: reader.read_uint32()?,
            info: reader.read_uint32()?,
        })
    }
}

/// A LIFO stack of [`ReturnStackItem`]s, paired with `max_response_size` budget
/// bookkeeping: pushing an item raises the budget by [`ITEM_WIRE_SIZE`] (so the
/// response path still has room to carry the stack back), popping reverses it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReturnStack {
    items: Vec<ReturnStackItem>,
}

impl ReturnStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ReturnStackItem] {
        &self.items
    }

    pub fn top(&self) -> Option<&ReturnStackItem> {
        self.items.last()
    }

    /// Push `item`, raising `*max_response_size` by one item's wire size. Fails if
    /// the stack is already at [`MAX_ITEMS`] or the budget would overflow `u32`.
    pub fn push(&mut self, item: ReturnStackItem, max_response_size: &mut u32) -> Result<(), FrameError> {
        if self.items.len() >= MAX_ITEMS {
            return Err(FrameError::ReturnStackOverflow {
                count: self.items.len() + 1,
                max: MAX_ITEMS,
            });
        }
        let raised = max_response_size
            .checked_add(ITEM_WIRE_SIZE)
            .ok_or(FrameError::ReturnStackOverflow {
                count: self.items.len() + 1,
                max: MAX_ITEMS,
            })?;
        self.items.push(item);
        *max_response_size = raised;
        Ok(())
    }

    /// Pop the top item, lowering `*max_response_size` by one item's wire size.
    /// Returns `None` if the stack is empty.
    pub fn pop(&mut self, max_response_size: &mut u32) -> Option<ReturnStackItem> {
        let item = self.items.pop()?;
        *max_response_size = max_response_size.saturating_sub(ITEM_WIRE_SIZE);
        Some(item)
    }

    pub fn wire_size(&self) -> u32 {
        1 + self.items.len() as u32 * ITEM_WIRE_SIZE
    }

    pub fn to_binary(&self, writer: &mut BitStreamWriter) -> Result<(), FrameError> {
        writer.write_uint8(self.items.len() as u8)?;
        for item in &self.items {
            item.to_binary(writer)?;
        }
        Ok(())
    }

    pub fn from_binary(reader: &mut BitStreamReader<'_>) -> Result<Self, FrameError> {
        let count = reader.read_uint8()? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(ReturnStackItem::from_binary(reader)?);
        }
        Ok(Self { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_restores_budget() {
        let mut stack = ReturnStack::new();
        let mut budget = 64u32;
        stack
            .push(ReturnStackItem { id: 1, info: 2 }, &mut budget)
            .unwrap();
        assert_eq!(budget, 72);
        assert_eq!(stack.pop(&mut budget), Some(ReturnStackItem { id: 1, info: 2 }));
        assert_eq!(budget, 64);
        assert!(stack.is_empty());
    }

    #[test]
    fn overflow_is_rejected() {
        let mut stack = ReturnStack::new();
        let mut budget = 0u32;
        for i in 0..MAX_ITEMS {
            stack
                .push(ReturnStackItem { id: i as u32, info: 0 }, &mut budget)
                .unwrap();
        }
        assert!(stack
            .push(ReturnStackItem { id: 999, info: 0 }, &mut budget)
            .is_err());
    }

    #[test]
    fn round_trips_through_binary() {
        let mut stack = ReturnStack::new();
        let mut budget = 0u32;
        stack.push(ReturnStackItem { id: 7, info: 9 }, &mut budget).unwrap();
        stack.push(ReturnStackItem { id: 8, info: 10 }, &mut budget).unwrap();

        let mut writer = BitStreamWriter::new();
        stack.to_binary(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BitStreamReader::new(&bytes);
        let decoded = ReturnStack::from_binary(&mut reader).unwrap();
        assert_eq!(decoded, stack);
    }
}
