//! Pretty printing of RAM programs, one statement per line with tab
//! indentation.

use crate::ram::{Condition, Operation, RamProgram, Stmt, Value};

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(value) => write!(f, "number({value})"),
            Value::ElementAccess {
                level,
                component,
                name,
            } => match name {
                Some(name) => write!(f, "env(t{level}.{component}:{name})"),
                None => write!(f, "env(t{level}.{component})"),
            },
            Value::AutoIncrement => write!(f, "autoinc()"),
            Value::Pack(values) => {
                write!(f, "pack(")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Value::UnaryOp { op, arg } => write!(f, "{}({arg})", op.symbol()),
            Value::BinaryOp { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Value::TernaryOp {
                op,
                first,
                second,
                third,
            } => write!(f, "{}({first},{second},{third})", op.symbol()),
            Value::Argument(index) => write!(f, "argument({index})"),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::BinaryRelation { op, lhs, rhs } => {
                write!(f, "{lhs} {} {rhs}", op.symbol())
            }
            Condition::NotExists { relation, args } => {
                write!(f, "not {relation}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    match arg {
                        Some(value) => write!(f, "{value}")?,
                        None => write!(f, "_")?,
                    }
                }
                write!(f, ")")
            }
            Condition::Empty(relation) => write!(f, "({relation} = ∅)"),
            Condition::And(lhs, rhs) => write!(f, "{lhs} and {rhs}"),
        }
    }
}

impl Operation {
    fn print(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        let pad = "\t".repeat(indent);
        match self {
            Operation::Scan {
                relation,
                level,
                pure_existence_check,
                condition,
                inner,
            } => {
                match pure_existence_check {
                    true => write!(f, "{pad}IF ∃t{level} ∈ {relation}")?,
                    false => write!(f, "{pad}SEARCH t{level} ∈ {relation}")?,
                }
                if let Some(condition) = condition {
                    write!(f, " WHERE {condition}")?;
                }
                writeln!(f)?;
                inner.print(f, indent + 1)
            }
            Operation::Lookup {
                ref_level,
                ref_component,
                arity,
                level,
                condition,
                inner,
            } => {
                write!(
                    f,
                    "{pad}UNPACK env(t{ref_level}.{ref_component}) INTO t{level} [{arity}]"
                )?;
                if let Some(condition) = condition {
                    write!(f, " WHERE {condition}")?;
                }
                writeln!(f)?;
                inner.print(f, indent + 1)
            }
            Operation::Aggregate {
                function,
                target,
                relation,
                level,
                condition,
                inner,
            } => {
                write!(f, "{pad}AGGREGATE t{level}.0 = {function}")?;
                if let Some(target) = target {
                    write!(f, " {target}")?;
                }
                write!(f, " FOR ALL t{level} ∈ {relation}")?;
                if let Some(condition) = condition {
                    write!(f, " WHERE {condition}")?;
                }
                writeln!(f)?;
                inner.print(f, indent + 1)
            }
            Operation::Project {
                relation,
                condition,
                values,
            } => {
                write!(f, "{pad}PROJECT (")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ") INTO {relation}")?;
                if let Some(condition) = condition {
                    write!(f, " IF {condition}")?;
                }
                writeln!(f)
            }
            Operation::Return { values } => {
                write!(f, "{pad}RETURN (")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    match value {
                        Some(value) => write!(f, "{value}")?,
                        None => write!(f, "_")?,
                    }
                }
                writeln!(f, ")")
            }
        }
    }
}

impl Stmt {
    fn print(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        let pad = "\t".repeat(indent);
        match self {
            Stmt::Sequence(stmts) => {
                for stmt in stmts {
                    stmt.print(f, indent)?;
                }
                Ok(())
            }
            Stmt::Parallel(stmts) => {
                writeln!(f, "{pad}PARALLEL")?;
                for stmt in stmts {
                    stmt.print(f, indent + 1)?;
                }
                writeln!(f, "{pad}END PARALLEL")
            }
            Stmt::Loop(stmts) => {
                writeln!(f, "{pad}LOOP")?;
                for stmt in stmts {
                    stmt.print(f, indent + 1)?;
                }
                writeln!(f, "{pad}END LOOP")
            }
            Stmt::Exit(condition) => writeln!(f, "{pad}EXIT {condition}"),
            Stmt::Create(relation) => {
                write!(f, "{pad}CREATE {relation}(")?;
                for index in 0..relation.arity {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    match relation.attribute(index) {
                        Some(name) => write!(f, "{name}")?,
                        None => write!(f, "c{index}")?,
                    }
                }
                writeln!(f, ")")
            }
            Stmt::Load(relation) => writeln!(f, "{pad}LOAD DATA FOR {relation}"),
            Stmt::Store(relation) => writeln!(f, "{pad}STORE DATA FOR {relation}"),
            Stmt::Clear(relation) => writeln!(f, "{pad}CLEAR {relation}"),
            Stmt::Drop(relation) => writeln!(f, "{pad}DROP {relation}"),
            Stmt::PrintSize(relation) => writeln!(f, "{pad}PRINTSIZE {relation}"),
            Stmt::Merge { target, source } => writeln!(f, "{pad}MERGE {target} WITH {source}"),
            Stmt::Swap { first, second } => writeln!(f, "{pad}SWAP ({first}, {second})"),
            Stmt::Fact { relation, values } => {
                write!(f, "{pad}INSERT (")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{value}")?;
                }
                writeln!(f, ") INTO {relation}")
            }
            Stmt::Insert { operation } => {
                writeln!(f, "{pad}INSERT")?;
                operation.print(f, indent + 1)
            }
            Stmt::LogTimer { label, inner } => {
                writeln!(f, "{pad}START_TIMER \"{label}\"")?;
                inner.print(f, indent + 1)?;
                writeln!(f, "{pad}END_TIMER")
            }
            Stmt::LogSize { relation, label } => {
                writeln!(f, "{pad}LOGSIZE {relation} \"{label}\"")
            }
            Stmt::DebugInfo { message, inner } => {
                writeln!(f, "{pad}BEGIN_DEBUG \"{}\"", message.replace('\n', " "))?;
                inner.print(f, indent + 1)?;
                writeln!(f, "{pad}END_DEBUG")
            }
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.print(f, 0)
    }
}

impl std::fmt::Display for RamProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PROGRAM")?;
        self.main.print(f, 1)?;
        for (label, subroutine) in &self.subroutines {
            writeln!(f, "SUBROUTINE {label}")?;
            subroutine.print(f, 1)?;
        }
        writeln!(f, "END PROGRAM")
    }
}
