/// The closed set of modules reachable through `Module::member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Gfx,
    Input,
    Color,
    Vector2,
    Math,
}

impl Module {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Gfx" => Some(Self::Gfx),
            "Input" => Some(Self::Input),
            "Color" => Some(Self::Color),
            "Vector2" => Some(Self::Vector2),
            "Math" => Some(Self::Math),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gfx => "Gfx",
            Self::Input => "Input",
            Self::Color => "Color",
            Self::Vector2 => "Vector2",
            Self::Math => "Math",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Called with `(args)`; the count must fall in `min..=max`.
    Function { min: usize, max: usize },
    /// Read without parentheses, e.g. `Gfx::width`.
    Property,
}

/// What the interpreter does for a builtin. One variant per table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOp {
    // Gfx
    SetResolution,
    Width,
    Height,
    SetBackground,
    Fill,
    Stroke,
    NoFill,
    NoStroke,
    DrawCircle,
    DrawRect,
    DrawImage,
    Image,
    // Input
    GetVector,
    IsDown,
    // Color
    ColorNew,
    ColorFromHex,
    // Vector2
    VectorNew,
    VectorZero,
    // Math
    Sin,
    Cos,
    Tan,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Atan2,
    Clamp,
    Pi,
}

/// Built-in module member: single source of truth for name, call shape and opcode.
#[derive(Debug, Clone)]
pub struct BuiltinMember {
    pub module: Module,
    pub name: &'static str,
    pub kind: MemberKind,
    pub op: BuiltinOp,
    pub description: &'static str,
}

const fn func(min: usize, max: usize) -> MemberKind {
    MemberKind::Function { min, max }
}

/// All namespaced members available in scripts.
pub static BUILTINS: &[BuiltinMember] = &[
    // ── Gfx ─────────────────────────────────────────────────────
    BuiltinMember {
        module: Module::Gfx, name: "setResolution", kind: func(2, 2),
        op: BuiltinOp::SetResolution, description: "Resize the drawing surface",
    },
    BuiltinMember {
        module: Module::Gfx, name: "width", kind: MemberKind::Property,
        op: BuiltinOp::Width, description: "Surface width in pixels",
    },
    BuiltinMember {
        module: Module::Gfx, name: "height", kind: MemberKind::Property,
        op: BuiltinOp::Height, description: "Surface height in pixels",
    },
    BuiltinMember {
        module: Module::Gfx, name: "setBackground", kind: func(1, 1),
        op: BuiltinOp::SetBackground, description: "Clear the surface with a color",
    },
    BuiltinMember {
        module: Module::Gfx, name: "fill", kind: func(1, 1),
        op: BuiltinOp::Fill, description: "Set the fill color",
    },
    BuiltinMember {
        module: Module::Gfx, name: "stroke", kind: func(1, 1),
        op: BuiltinOp::Stroke, description: "Set the stroke color",
    },
    BuiltinMember {
        module: Module::Gfx, name: "noFill", kind: func(0, 0),
        op: BuiltinOp::NoFill, description: "Fill with transparent",
    },
    BuiltinMember {
        module: Module::Gfx, name: "noStroke", kind: func(0, 0),
        op: BuiltinOp::NoStroke, description: "Stroke with transparent",
    },
    BuiltinMember {
        module: Module::Gfx, name: "drawCircle", kind: func(2, 2),
        op: BuiltinOp::DrawCircle, description: "Circle at pos with radius",
    },
    BuiltinMember {
        module: Module::Gfx, name: "drawRect", kind: func(3, 3),
        op: BuiltinOp::DrawRect, description: "Rectangle with top-left pos, width, height",
    },
    BuiltinMember {
        module: Module::Gfx, name: "drawImage", kind: func(2, 2),
        op: BuiltinOp::DrawImage, description: "Image centred on pos",
    },
    BuiltinMember {
        module: Module::Gfx, name: "image", kind: func(1, 1),
        op: BuiltinOp::Image, description: "Look up a host-registered image by name",
    },
    // ── Input ───────────────────────────────────────────────────
    BuiltinMember {
        module: Module::Input, name: "getVector", kind: func(4, 4),
        op: BuiltinOp::GetVector, description: "Normalized direction from four held keys",
    },
    BuiltinMember {
        module: Module::Input, name: "isDown", kind: func(1, 1),
        op: BuiltinOp::IsDown, description: "Whether a key is held",
    },
    // ── Color ───────────────────────────────────────────────────
    BuiltinMember {
        module: Module::Color, name: "new", kind: func(3, 4),
        op: BuiltinOp::ColorNew, description: "Color from 0-255 channels and optional 0-1 alpha",
    },
    BuiltinMember {
        module: Module::Color, name: "fromHex", kind: func(1, 1),
        op: BuiltinOp::ColorFromHex, description: "Color from #rgb or #rrggbb",
    },
    // ── Vector2 ─────────────────────────────────────────────────
    BuiltinMember {
        module: Module::Vector2, name: "new", kind: func(2, 2),
        op: BuiltinOp::VectorNew, description: "Vector from x and y",
    },
    BuiltinMember {
        module: Module::Vector2, name: "zero", kind: func(0, 0),
        op: BuiltinOp::VectorZero, description: "The zero vector",
    },
    // ── Math ────────────────────────────────────────────────────
    BuiltinMember {
        module: Module::Math, name: "sin", kind: func(1, 1),
        op: BuiltinOp::Sin, description: "Sine",
    },
    BuiltinMember {
        module: Module::Math, name: "cos", kind: func(1, 1),
        op: BuiltinOp::Cos, description: "Cosine",
    },
    BuiltinMember {
        module: Module::Math, name: "tan", kind: func(1, 1),
        op: BuiltinOp::Tan, description: "Tangent",
    },
    BuiltinMember {
        module: Module::Math, name: "sqrt", kind: func(1, 1),
        op: BuiltinOp::Sqrt, description: "Square root",
    },
    BuiltinMember {
        module: Module::Math, name: "abs", kind: func(1, 1),
        op: BuiltinOp::Abs, description: "Absolute value",
    },
    BuiltinMember {
        module: Module::Math, name: "floor", kind: func(1, 1),
        op: BuiltinOp::Floor, description: "Round down",
    },
    BuiltinMember {
        module: Module::Math, name: "ceil", kind: func(1, 1),
        op: BuiltinOp::Ceil, description: "Round up",
    },
    BuiltinMember {
        module: Module::Math, name: "round", kind: func(1, 1),
        op: BuiltinOp::Round, description: "Round to nearest",
    },
    BuiltinMember {
        module: Module::Math, name: "min", kind: func(2, 2),
        op: BuiltinOp::Min, description: "Minimum",
    },
    BuiltinMember {
        module: Module::Math, name: "max", kind: func(2, 2),
        op: BuiltinOp::Max, description: "Maximum",
    },
    BuiltinMember {
        module: Module::Math, name: "atan2", kind: func(2, 2),
        op: BuiltinOp::Atan2, description: "Arctangent of y/x",
    },
    BuiltinMember {
        module: Module::Math, name: "clamp", kind: func(3, 3),
        op: BuiltinOp::Clamp, description: "Constrain x to [min, max]",
    },
    BuiltinMember {
        module: Module::Math, name: "PI", kind: MemberKind::Property,
        op: BuiltinOp::Pi, description: "Ratio of circumference to diameter",
    },
];

// ── Global functions ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalOp {
    Emit,
    Destroy,
    Print,
}

#[derive(Debug, Clone)]
pub struct GlobalFn {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub op: GlobalOp,
    pub description: &'static str,
}

pub static GLOBALS: &[GlobalFn] = &[
    GlobalFn {
        name: "emit", min_args: 1, max_args: 2,
        op: GlobalOp::Emit, description: "Broadcast an event with an optional payload",
    },
    GlobalFn {
        name: "destroy", min_args: 1, max_args: 1,
        op: GlobalOp::Destroy, description: "Mark an entity for removal",
    },
    GlobalFn {
        name: "print", min_args: 1, max_args: 1,
        op: GlobalOp::Print, description: "Log a value",
    },
];

pub fn lookup_member(module: &str, member: &str) -> Option<&'static BuiltinMember> {
    let module = Module::from_name(module)?;
    BUILTINS.iter().find(|b| b.module == module && b.name == member)
}

pub fn lookup_global(name: &str) -> Option<&'static GlobalFn> {
    GLOBALS.iter().find(|g| g.name == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn member_lookup() {
        let m = lookup_member("Gfx", "drawCircle").unwrap();
        assert_eq!(m.op, BuiltinOp::DrawCircle);
        assert_eq!(m.kind, MemberKind::Function { min: 2, max: 2 });
        assert_eq!(lookup_member("Math", "PI").unwrap().kind, MemberKind::Property);
    }

    #[test]
    fn unknown_module_or_member() {
        assert!(lookup_member("Audio", "play").is_none());
        assert!(lookup_member("Gfx", "teleport").is_none());
    }

    #[test]
    fn same_member_name_in_two_modules() {
        assert_eq!(lookup_member("Color", "new").unwrap().op, BuiltinOp::ColorNew);
        assert_eq!(lookup_member("Vector2", "new").unwrap().op, BuiltinOp::VectorNew);
    }

    #[test]
    fn no_duplicate_entries() {
        for (i, a) in BUILTINS.iter().enumerate() {
            for b in BUILTINS.iter().skip(i + 1) {
                assert!(!(a.module == b.module && a.name == b.name), "duplicate {}::{}", a.module.name(), a.name);
            }
        }
    }

    #[test]
    fn globals() {
        assert_eq!(lookup_global("emit").unwrap().op, GlobalOp::Emit);
        assert!(lookup_global("spawn").is_none());
    }
}
