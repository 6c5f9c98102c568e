//! A small, in-process object dictionary used as this CLI's target.
//!
//! `cood-core` has no transport of its own -- a real deployment wires an
//! [`ObjectDictionary`] up to whatever SDO/CoE service terminates the wire protocol.
//! Lacking that here, the CLI builds a handful of representative objects (one of
//! each shape) at startup so the `enum`/`info`/`read`/`write`/`caread`/`cawrite`
//! subcommands have something real to exercise.

use cood_core::object::{share, Array, ObjectStorage, Record, SubindexSpec, Variable};
use cood_core::{Object, ObjectDictionary};
use cood_common::{AbortCode, Attributes, DataType, Value};

/// Single-slot storage for a VARIABLE.
struct Cell(Value);

impl ObjectStorage for Cell {
    fn get(&self, _element: usize) -> Value {
        self.0.clone()
    }

    fn set(&mut self, _element: usize, value: Value) -> Result<(), AbortCode> {
        self.0 = value;
        Ok(())
    }
}

/// Backs an ARRAY: a homogeneous `Vec<Value>` with a resizable active length.
struct ArrayCells {
    elements: Vec<Value>,
    active: usize,
}

impl ObjectStorage for ArrayCells {
    fn get(&self, element: usize) -> Value {
        self.elements
            .get(element - 1)
            .cloned()
            .unwrap_or(Value::Unsigned16(0))
    }

    fn set(&mut self, element: usize, value: Value) -> Result<(), AbortCode> {
        if element == 0 || element > self.elements.len() {
            return Err(AbortCode::ValueRangeExceeded);
        }
        self.elements[element - 1] = value;
        Ok(())
    }

    fn element_count(&self) -> usize {
        self.active
    }

    fn set_element_count(&mut self, count: usize) -> Result<(), AbortCode> {
        if count > self.elements.len() {
            return Err(AbortCode::ValueRangeExceeded);
        }
        self.active = count;
        Ok(())
    }
}

/// Backs a RECORD: one `Value` slot per subindex, 1-indexed.
struct RecordFields(Vec<Value>);

impl ObjectStorage for RecordFields {
    fn get(&self, element: usize) -> Value {
        self.0
            .get(element - 1)
            .cloned()
            .unwrap_or(Value::Unsigned32(0))
    }

    fn set(&mut self, element: usize, value: Value) -> Result<(), AbortCode> {
        match self.0.get_mut(element - 1) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AbortCode::SubindexDoesNotExist),
        }
    }
}

/// Index of the demo VARIABLE: a plain read-write counter.
pub const IDX_COUNTER: u16 = 0x2000;
/// Index of the demo ARRAY: up to 4 `Unsigned16` elements, resizable.
pub const IDX_SAMPLES: u16 = 0x2001;
/// Index of the demo RECORD: a device-info style object with a 32-bit
/// alignment gap at SI2.
pub const IDX_DEVICE_INFO: u16 = 0x2002;

pub fn build() -> ObjectDictionary {
    let od = ObjectDictionary::new();

    od.register(
        IDX_COUNTER,
        Object::Variable(Variable::new(
            SubindexSpec::scalar(DataType::Unsigned32, Attributes::read_write()),
            share(Cell(Value::Unsigned32(0))),
        )),
    )
    .expect("demo OD indices are fixed and unique");

    od.register(
        IDX_SAMPLES,
        Object::Array(Array::new(
            SubindexSpec::scalar(DataType::Unsigned16, Attributes::read_write()).with_name("sample"),
            Attributes::read_write(),
            4,
            share(ArrayCells {
                elements: vec![Value::Unsigned16(0); 4],
                active: 2,
            }),
        )),
    )
    .expect("demo OD indices are fixed and unique");

    let subs = vec![
        SubindexSpec::scalar(DataType::Unsigned32, Attributes::read_constant()).with_name("serial"),
        SubindexSpec::gap(Attributes::read_write(), 32).with_name("align"),
        SubindexSpec::string(DataType::VisibleString, Attributes::read_only(), 16).with_name("model"),
    ];
    od.register(
        IDX_DEVICE_INFO,
        Object::Record(
            Record::new(
                subs,
                share(RecordFields(vec![
                    Value::Unsigned32(0xdead_beef),
                    Value::Unsigned32(0),
                    Value::VisibleString("cood-demo".to_string()),
                ])),
            )
            .with_name("device info"),
        ),
    )
    .expect("demo OD indices are fixed and unique");

    od
}
