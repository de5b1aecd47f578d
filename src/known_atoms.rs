use crate::SExpr;

macro_rules! for_each_known_atom {
    ( $mac:ident ) => {
        $mac! {
            assert: "assert+";
            check: "check";
            push: "push";
            pop: "pop";
            reset: "reset";
            exit: "exit";
            define: "define";
            lambda: "lambda";
            get_value: "get-value";
            get_proof: "get-proof";
            get_unsat_core: "get-unsat-core";
            get_assignment: "get-assignment";
            arrow: "->";
            and: "and";
            neq: "/=";
            minus: "-";
            zero: "0";
            forall: "forall";
            exists: "exists";
            let_: "let";
            bool: "bool";
            int: "int";
            real: "real";
        }
    };
}

macro_rules! define_known_atoms {
    ( $( $id:ident : $atom:expr ; )* ) => {
        /// The fixed vocabulary of the yices input language.
        #[non_exhaustive]
        pub struct KnownAtoms {
            $(
                #[doc = "The atom: `"]
                #[doc = $atom]
                #[doc = "`"]
                pub $id: SExpr,
            )*
        }

        impl KnownAtoms {
            pub fn new() -> Self {
                KnownAtoms {
                    $( $id: SExpr::atom($atom), )*
                }
            }
        }
    };
}

for_each_known_atom!(define_known_atoms);

impl Default for KnownAtoms {
    fn default() -> Self {
        Self::new()
    }
}
