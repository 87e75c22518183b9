//! Static catalog of study subjects and their topics

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub topics: &'static [&'static str],
}

pub const SUBJECTS: &[Subject] = &[
    Subject {
        id: "data-structures",
        name: "Data Structures",
        description: "Arrays, Linked Lists, Trees, Graphs, Hash Tables",
        topics: &[
            "Arrays & Strings",
            "Linked Lists",
            "Stacks & Queues",
            "Trees & BST",
            "Heaps & Priority Queues",
            "Hash Tables",
            "Graphs",
            "Tries",
        ],
    },
    Subject {
        id: "algorithms",
        name: "Algorithms",
        description: "Sorting, Searching, Dynamic Programming, Greedy",
        topics: &[
            "Sorting Algorithms",
            "Searching Algorithms",
            "Recursion & Backtracking",
            "Dynamic Programming",
            "Greedy Algorithms",
            "Divide & Conquer",
            "Graph Algorithms",
            "Complexity Analysis",
        ],
    },
    Subject {
        id: "dbms",
        name: "DBMS",
        description: "SQL, Normalization, Transactions, Indexing",
        topics: &[
            "ER Model & Design",
            "Relational Model",
            "SQL Queries",
            "Normalization",
            "Transactions & Concurrency",
            "Indexing",
            "Query Optimization",
            "NoSQL Basics",
        ],
    },
    Subject {
        id: "os",
        name: "Operating Systems",
        description: "Processes, Memory, Scheduling, File Systems",
        topics: &[
            "Processes & Threads",
            "CPU Scheduling",
            "Process Synchronization",
            "Deadlocks",
            "Memory Management",
            "Virtual Memory",
            "File Systems",
            "I/O Systems",
        ],
    },
    Subject {
        id: "math",
        name: "Discrete Math",
        description: "Logic, Set Theory, Probability, Graph Theory",
        topics: &[
            "Propositional Logic",
            "Set Theory",
            "Relations & Functions",
            "Combinatorics",
            "Probability",
            "Graph Theory",
            "Number Theory",
            "Boolean Algebra",
        ],
    },
];

/// Look up a subject by its id
pub fn find(id: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.id == id)
}

impl Subject {
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(&topic)
    }
}
