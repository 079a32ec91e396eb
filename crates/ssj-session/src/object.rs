//! Request-scoped views of debuggee values: object properties, frame
//! locals, and evaluation results.

use std::fmt;

use ssj_wire::{Atom, Message, WireError};

/// Property attribute bits as sent in an `InspectObject` reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PropFlags(pub u32);

impl PropFlags {
    pub const WRITABLE: u32 = 0x01;
    pub const ENUMERABLE: u32 = 0x02;
    pub const CONFIGURABLE: u32 = 0x04;
    /// The property is a getter/setter pair rather than a plain value.
    pub const ACCESSOR: u32 = 0x08;
    /// Engine-internal property, hidden unless asked for.
    pub const INTERNAL: u32 = 0x100;

    pub fn writable(self) -> bool {
        self.0 & Self::WRITABLE != 0
    }

    pub fn enumerable(self) -> bool {
        self.0 & Self::ENUMERABLE != 0
    }

    pub fn configurable(self) -> bool {
        self.0 & Self::CONFIGURABLE != 0
    }

    pub fn is_accessor(self) -> bool {
        self.0 & Self::ACCESSOR != 0
    }

    pub fn is_internal(self) -> bool {
        self.0 & Self::INTERNAL != 0
    }
}

impl fmt::Display for PropFlags {
    /// Three-letter `wec` summary, with `-` for each cleared bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(self.writable(), 'w'),
            bit(self.enumerable(), 'e'),
            bit(self.configurable(), 'c')
        )
    }
}

/// What a property holds.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Data(Atom),
    Accessor { getter: Atom, setter: Atom },
}

/// One named property of an inspected object.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub flags: PropFlags,
    pub value: PropValue,
}

impl Property {
    /// Decode an `InspectObject` reply.
    ///
    /// Each property is a key (string, or integer for array indices), a
    /// flags integer, then either one value atom or a getter/setter pair
    /// when [`PropFlags::ACCESSOR`] is set. Internal properties are dropped
    /// unless `show_all` is true.
    pub fn list_from_reply(reply: &Message, show_all: bool) -> Result<Vec<Property>, WireError> {
        let mut props = Vec::new();
        let mut i = 0;
        while i < reply.len() {
            let key = match reply.atom(i)? {
                Atom::String(s) => s.clone(),
                Atom::Int(n) => n.to_string(),
                other => {
                    return Err(WireError::violation(format!(
                        "property key must be string or int, found {}",
                        other.type_name()
                    )))
                }
            };
            let flags = PropFlags(reply.int(i + 1)? as u32);
            let value = if flags.is_accessor() {
                let getter = reply.atom(i + 2)?.clone();
                let setter = reply.atom(i + 3)?.clone();
                i += 4;
                PropValue::Accessor { getter, setter }
            } else {
                let value = reply.atom(i + 2)?.clone();
                i += 3;
                PropValue::Data(value)
            };
            if flags.is_internal() && !show_all {
                continue;
            }
            props.push(Property { key, flags, value });
        }
        Ok(props)
    }
}

/// A local variable in a stack frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Declared class of the value, e.g. `Object` or `Number`.
    pub class_name: String,
    pub value: Atom,
}

impl Variable {
    /// Decode an `InspectLocals` reply: repeated `(name, class, value)`.
    pub fn list_from_reply(reply: &Message) -> Result<Vec<Variable>, WireError> {
        if reply.len() % 3 != 0 {
            return Err(WireError::violation(format!(
                "locals reply has {} atoms, not a multiple of 3",
                reply.len()
            )));
        }
        (0..reply.len())
            .step_by(3)
            .map(|base| {
                Ok(Variable {
                    name: reply.string(base)?.to_owned(),
                    class_name: reply.string(base + 1)?.to_owned(),
                    value: reply.atom(base + 2)?.clone(),
                })
            })
            .collect()
    }
}

/// Result of evaluating an expression in the debuggee.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// A primitive, or a handle to a live object.
    pub value: Atom,
    /// The expression threw; `value` is the thrown value.
    pub is_error: bool,
}

impl Evaluation {
    /// Decode an `Eval` reply: `(is_error, value)`.
    pub fn from_reply(reply: &Message) -> Result<Self, WireError> {
        Ok(Self {
            is_error: reply.bool(0)?,
            value: reply.atom(1)?.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssj_wire::Handle;

    const W: u32 = PropFlags::WRITABLE;
    const E: u32 = PropFlags::ENUMERABLE;
    const C: u32 = PropFlags::CONFIGURABLE;

    fn object_reply() -> Message {
        Message::reply()
            .arg("name")
            .arg((W | E | C) as i32)
            .arg("Scott")
            .arg(0)
            .arg((W | E) as i32)
            .arg(Handle(0x40))
            .arg("level")
            .arg((E | PropFlags::ACCESSOR) as i32)
            .arg(Handle(0x41))
            .arg(Atom::Undefined)
            .arg("\u{ff}hidden")
            .arg((W | PropFlags::INTERNAL) as i32)
            .arg(1)
    }

    #[test]
    fn properties_decode_data_and_accessors() {
        let props = Property::list_from_reply(&object_reply(), false).unwrap();
        assert_eq!(props.len(), 3);

        assert_eq!(props[0].key, "name");
        assert_eq!(props[0].value, PropValue::Data(Atom::from("Scott")));
        assert_eq!(props[0].flags.to_string(), "wec");

        assert_eq!(props[1].key, "0");
        assert_eq!(props[1].value, PropValue::Data(Atom::Handle(Handle(0x40))));

        assert_eq!(props[2].key, "level");
        assert_eq!(
            props[2].value,
            PropValue::Accessor {
                getter: Atom::Handle(Handle(0x41)),
                setter: Atom::Undefined,
            }
        );
        assert_eq!(props[2].flags.to_string(), "-e-");
    }

    #[test]
    fn properties_show_all_includes_internal() {
        let props = Property::list_from_reply(&object_reply(), true).unwrap();
        assert_eq!(props.len(), 4);
        assert!(props[3].flags.is_internal());
        assert_eq!(props[3].value, PropValue::Data(Atom::Int(1)));
    }

    #[test]
    fn properties_truncated_reply_is_violation() {
        let reply = Message::reply().arg("level").arg(PropFlags::ACCESSOR as i32).arg(1);
        assert!(Property::list_from_reply(&reply, true).is_err());
        let reply = Message::reply().arg(Atom::Null).arg(0).arg(1);
        assert!(Property::list_from_reply(&reply, true).is_err());
    }

    #[test]
    fn locals_decode_triples() {
        let reply = Message::reply()
            .arg("hp")
            .arg("Number")
            .arg(812)
            .arg("party")
            .arg("Array")
            .arg(Handle(9));
        let vars = Variable::list_from_reply(&reply).unwrap();
        assert_eq!(
            vars,
            vec![
                Variable {
                    name: "hp".into(),
                    class_name: "Number".into(),
                    value: Atom::Int(812),
                },
                Variable {
                    name: "party".into(),
                    class_name: "Array".into(),
                    value: Atom::Handle(Handle(9)),
                },
            ]
        );
        assert!(Variable::list_from_reply(&Message::reply().arg("hp")).is_err());
    }

    #[test]
    fn evaluation_decode() {
        let eval = Evaluation::from_reply(&Message::reply().arg(false).arg(3)).unwrap();
        assert_eq!(
            eval,
            Evaluation {
                value: Atom::Int(3),
                is_error: false,
            }
        );
        let eval =
            Evaluation::from_reply(&Message::reply().arg(true).arg("TypeError: boom")).unwrap();
        assert!(eval.is_error);
        assert!(Evaluation::from_reply(&Message::reply().arg(1)).is_err());
    }
}
